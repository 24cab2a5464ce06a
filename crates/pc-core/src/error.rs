//! Core error types for the performance championship

use pc_protocol::{ParticipantId, ProtocolError};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the championship components
#[derive(Error, Debug)]
pub enum PcError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Scenario error
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// Agent error
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Connection refused
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Connection lost
    #[error("Connection lost: {0}")]
    Lost(String),

    /// Orchestrator turned the registration down
    #[error("Registration rejected: {0}")]
    Rejected(String),

    /// Every connection attempt failed
    #[error("Gave up after {attempts} connection attempts")]
    RetriesExhausted { attempts: u32 },

    /// No acknowledgment within the timeout
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

/// Registry errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Participant has never registered
    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),
}

/// Scenario orchestration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    /// No scenario with this name is configured
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// A run is already in progress
    #[error("Scenario already running: {0}")]
    AlreadyRunning(String),

    /// No run is in progress
    #[error("No scenario is running")]
    NotRunning,

    /// Conclude requires at least one collected result
    #[error("No results to conclude yet")]
    NotAggregating,
}

/// Agent-side execution errors
#[derive(Error, Debug)]
pub enum AgentError {
    /// A scenario is already executing
    #[error("Already executing scenario {0}")]
    Busy(String),

    /// Connection failure
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Outbound channel closed
    #[error("Outbound channel closed")]
    ChannelClosed,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
