//! Agent configuration

use pc_protocol::ParticipantId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::device::DeviceProfile;
use super::serde_utils::duration_secs;

/// Port the orchestrator accepts agents on by default
pub const DEFAULT_AGENT_PORT: u16 = 5000;

/// Configuration for the measurement agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Orchestrator address to connect to
    pub orchestrator_address: String,

    /// Participant identity; detected from the CPU architecture when unset
    pub participant: Option<ParticipantId>,

    /// Connection retry policy
    pub retry: RetryConfig,

    /// Timeout for the TCP connect and the registration ack
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Interval between metrics samples
    #[serde(with = "duration_secs")]
    pub metrics_interval: Duration,

    /// Device profile override; the built-in one for the participant otherwise
    pub device: Option<DeviceProfile>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            orchestrator_address: "127.0.0.1:5000".to_string(),
            participant: None,
            retry: RetryConfig::default(),
            connect_timeout: Duration::from_secs(10),
            metrics_interval: Duration::from_secs(2),
            device: None,
        }
    }
}

impl AgentConfig {
    /// Effective device profile for a participant
    pub fn device_profile(&self, id: ParticipantId) -> DeviceProfile {
        self.device
            .clone()
            .unwrap_or_else(|| DeviceProfile::default_for(id))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if let Some(device) = &self.device {
            device.validate()?;
        }
        if self.metrics_interval.is_zero() {
            return Err(crate::error::ConfigError::Invalid(
                "metrics_interval must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Point the agent at an orchestrator, adding the default port when missing
    pub fn set_orchestrator(&mut self, address: &str) {
        self.orchestrator_address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:{}", address, DEFAULT_AGENT_PORT)
        };
    }
}

/// Bounded linear retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts before giving up
    pub max_attempts: u32,

    /// Delay after attempt `n` is `n * backoff_step`
    #[serde(with = "duration_secs")]
    pub backoff_step: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_secs(2),
        }
    }
}
