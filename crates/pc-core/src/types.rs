//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host details an agent reports when it registers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Machine hostname
    pub hostname: String,
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// Protocol version the agent speaks
    pub version: Option<String>,
}

impl HostInfo {
    /// Describe the local machine
    pub fn local(version: Option<String>) -> Self {
        Self {
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            version,
        }
    }
}

/// Connection status for a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Participant is connected and reporting
    Connected,
    /// Participant is disconnected or stale
    Disconnected,
}

impl ConnectionStatus {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Phase of the scenario state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoPhase {
    /// No run in progress
    #[default]
    Idle,
    /// Run dispatched, no results yet
    Running,
    /// At least one result collected, waiting for the rest
    Aggregating,
}

impl DemoPhase {
    /// Whether a run is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, DemoPhase::Idle)
    }
}

impl fmt::Display for DemoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoPhase::Idle => write!(f, "idle"),
            DemoPhase::Running => write!(f, "running"),
            DemoPhase::Aggregating => write!(f, "aggregating"),
        }
    }
}
