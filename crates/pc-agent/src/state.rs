//! Agent state management

use pc_core::config::{AgentConfig, DeviceProfile};
use pc_protocol::ParticipantId;

/// Resolved identity and settings for the agent
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Configuration
    pub config: AgentConfig,
    /// Participant this agent registers as
    pub participant: ParticipantId,
    /// Device simulated by this agent
    pub profile: DeviceProfile,
}

impl AgentState {
    /// Create new agent state
    pub fn new(config: AgentConfig, participant: ParticipantId) -> Self {
        let profile = config.device_profile(participant);
        Self {
            config,
            participant,
            profile,
        }
    }
}
