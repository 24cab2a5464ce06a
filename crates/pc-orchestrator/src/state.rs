//! Global orchestrator state

use std::sync::Arc;
use std::time::Instant;

use pc_core::config::OrchestratorConfig;
use pc_core::ipc::{DeviceInfo, OrchestratorStatus, ScenarioInfo};
use pc_core::ConnectionStatus;
use pc_protocol::ParticipantId;

use crate::connection::ConnectionPool;
use crate::coordinator::DemoCoordinator;
use crate::events::EventBus;
use crate::registry::DeviceRegistry;

/// State shared by the agent server, the IPC server and the liveness monitor
pub struct OrchestratorState {
    /// Configuration
    pub config: OrchestratorConfig,
    /// Participant registry
    pub registry: Arc<DeviceRegistry>,
    /// Live agent sessions
    pub connections: Arc<ConnectionPool>,
    /// Scenario state machine
    pub coordinator: DemoCoordinator,
    /// Observer fan-out
    pub events: EventBus,
    /// When the orchestrator started
    pub started_at: Instant,
}

impl OrchestratorState {
    pub fn new(config: OrchestratorConfig) -> Self {
        let coordinator =
            DemoCoordinator::new(config.scenarios.clone(), config.expected_participants());
        Self {
            config,
            registry: Arc::new(DeviceRegistry::new()),
            connections: Arc::new(ConnectionPool::new()),
            coordinator,
            events: EventBus::default(),
            started_at: Instant::now(),
        }
    }

    /// Whether a participant takes part in runs
    pub fn is_expected(&self, id: ParticipantId) -> bool {
        self.coordinator.expected().contains(&id)
    }

    /// Expected participants plus any other registered one, in canonical order
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let snapshot = self.registry.snapshot();
        let mut ids: Vec<ParticipantId> = self.coordinator.expected().to_vec();
        ids.extend(snapshot.iter().map(|e| e.id));
        ids.sort();
        ids.dedup();

        ids.into_iter()
            .map(|id| {
                let profile = self.config.device(id);
                let entry = snapshot.iter().find(|e| e.id == id);
                DeviceInfo {
                    id,
                    name: profile.name,
                    status: ConnectionStatus::from_connected(entry.map_or(false, |e| e.connected)),
                    last_seen: entry.and_then(|e| e.last_seen),
                    host: entry.and_then(|e| e.host.clone()),
                    metrics: entry
                        .and_then(|e| e.latest_metrics.as_ref())
                        .map(pc_core::ipc::metrics_to_json),
                    specs: profile.specs,
                }
            })
            .collect()
    }

    /// Scenario catalogue
    pub fn scenarios(&self) -> Vec<ScenarioInfo> {
        self.coordinator
            .scenarios()
            .iter()
            .map(|(name, def)| ScenarioInfo {
                name: name.clone(),
                description: def.description.clone(),
                duration_secs: def.duration_secs,
                steps: def.steps,
                measurement: def.rule.measurement,
                objective: def.rule.objective,
            })
            .collect()
    }

    pub async fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: true,
            uptime_secs: self.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            bind_address: self.config.bind_address.clone(),
            connected_count: self.registry.connected_count(),
            demo: self.coordinator.status().await,
        }
    }

    /// Welcome text for a registering participant
    pub fn welcome_message(&self, id: ParticipantId) -> String {
        format!(
            "Welcome to the Championship, {}!",
            self.config.device(id).name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_core::HostInfo;

    #[test]
    fn test_devices_include_unregistered_expected() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        state
            .registry
            .register(ParticipantId::Intel, 1, HostInfo::local(None), 42);

        let devices = state.devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, ParticipantId::Snapdragon);
        assert_eq!(devices[0].status, ConnectionStatus::Disconnected);
        assert_eq!(devices[0].last_seen, None);
        assert_eq!(devices[1].status, ConnectionStatus::Connected);
        assert_eq!(devices[1].last_seen, Some(42));
        assert_eq!(devices[1].name, "Lenovo Yoga 7i");
    }

    #[test]
    fn test_welcome_message() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        assert_eq!(
            state.welcome_message(ParticipantId::Snapdragon),
            "Welcome to the Championship, Samsung Galaxy Book4 Edge!"
        );
    }
}
