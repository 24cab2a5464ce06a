//! Orchestrator configuration

use pc_protocol::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::commentary::{default_commentary_rules, CommentaryRule};
use super::device::DeviceProfile;
use super::scenario::{default_loading_messages, default_scenarios, ScenarioDefinition};
use super::serde_utils::duration_secs;

/// Configuration for the orchestrator daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Address agents connect to
    pub bind_address: String,

    /// IPC port for observers (localhost only)
    pub ipc_port: u16,

    /// How often the liveness monitor runs
    #[serde(with = "duration_secs")]
    pub liveness_interval: Duration,

    /// Silence after which a participant is considered disconnected
    #[serde(with = "duration_secs")]
    pub liveness_threshold: Duration,

    /// Participants a run waits for before declaring a winner
    pub participants: Vec<ParticipantId>,

    /// Device profiles keyed by participant name
    pub devices: BTreeMap<String, DeviceProfile>,

    /// Scenario catalogue keyed by scenario name
    pub scenarios: BTreeMap<String, ScenarioDefinition>,

    /// Commentary rule table
    pub commentary: Vec<CommentaryRule>,

    /// Lines picked at random when a scenario starts
    pub loading_messages: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            ipc_port: crate::ipc::DEFAULT_IPC_PORT,
            liveness_interval: Duration::from_secs(5),
            liveness_threshold: Duration::from_secs(10),
            participants: ParticipantId::ALL.to_vec(),
            devices: ParticipantId::ALL
                .iter()
                .map(|id| (id.as_str().to_string(), DeviceProfile::default_for(*id)))
                .collect(),
            scenarios: default_scenarios(),
            commentary: default_commentary_rules(),
            loading_messages: default_loading_messages(),
        }
    }
}

impl OrchestratorConfig {
    /// Get the IPC address (localhost:port)
    pub fn ipc_address(&self) -> String {
        format!("127.0.0.1:{}", self.ipc_port)
    }

    /// Profile for a participant, falling back to the built-in one
    pub fn device(&self, id: ParticipantId) -> DeviceProfile {
        self.devices
            .get(id.as_str())
            .cloned()
            .unwrap_or_else(|| DeviceProfile::default_for(id))
    }

    /// Expected participants in canonical order, deduplicated
    pub fn expected_participants(&self) -> Vec<ParticipantId> {
        let mut ids = self.participants.clone();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError;

        if self.participants.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one participant is required".into(),
            ));
        }
        for (name, profile) in &self.devices {
            name.parse::<ParticipantId>()
                .map_err(|e| ConfigError::Invalid(format!("devices: {}", e)))?;
            profile
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("devices.{}: {}", name, e)))?;
        }
        if self.liveness_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "liveness_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
