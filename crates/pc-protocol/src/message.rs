//! Message types for the championship protocol
//!
//! This module defines the messages exchanged between agents and the
//! orchestrator. Messages are serialized into frames using the codec defined
//! in `codec.rs`.
//!
//! # Message Flow
//!
//! 1. Agent connects and sends `Register`
//! 2. Orchestrator responds with `RegisterAck` (welcome text or rejection reason)
//! 3. Agent streams `MetricsSample` on a fixed interval for the rest of the connection
//! 4. Orchestrator sends `ScenarioStart` to every participant when a demo begins
//! 5. Agent emits `ScenarioProgress` after each step, then exactly one `ScenarioResult`
//! 6. `ScenarioStop` from the orchestrator abandons an in-flight run

use serde::{Deserialize, Serialize};

use crate::participant::ParticipantId;
use crate::value::{Metrics, Params};

/// Current protocol version string.
///
/// Sent in `Register` so the orchestrator can log mismatched agents.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Message type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Agent registration (agent → orchestrator)
    Register = 0x01,
    /// Registration acknowledgment
    RegisterAck = 0x02,
    /// Periodic metrics sample
    MetricsSample = 0x03,
    /// Start a scenario run
    ScenarioStart = 0x04,
    /// Abandon the current run
    ScenarioStop = 0x05,
    /// Per-step progress
    ScenarioProgress = 0x06,
    /// Terminal result of a run
    ScenarioResult = 0x07,
    /// Error response
    Error = 0xFF,
}

impl MessageType {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Register),
            0x02 => Some(Self::RegisterAck),
            0x03 => Some(Self::MetricsSample),
            0x04 => Some(Self::ScenarioStart),
            0x05 => Some(Self::ScenarioStop),
            0x06 => Some(Self::ScenarioProgress),
            0x07 => Some(Self::ScenarioResult),
            0xFF => Some(Self::Error),
            _ => None,
        }
    }
}

/// Error codes for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    /// Unknown error
    Unknown = 0,
    /// Message arrived before registration
    NotRegistered = 1,
    /// Message named a participant other than the registered one
    ParticipantMismatch = 2,
    /// Agent already executing a scenario
    Busy = 3,
    /// Invalid message
    InvalidMessage = 4,
}

/// Scenario parameters handed to each agent.
///
/// Immutable once the run has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario name (e.g. `ai_showdown`)
    pub name: String,
    /// Wall-clock budget for the run
    pub duration_secs: u64,
    /// Number of progress steps
    pub step_count: u32,
    /// Scenario-specific parameters, opaque to the orchestrator
    pub params: Params,
}

impl ScenarioConfig {
    /// Steps to execute; a zero step count still runs one step
    pub fn total_steps(&self) -> u32 {
        self.step_count.max(1)
    }
}

/// Which value of a terminal result a scenario is judged on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    /// Seconds the run took
    ElapsedTime,
    /// Battery percentage points consumed
    BatteryDrain,
    /// Highest temperature seen during the run
    PeakTemperature,
}

/// Terminal measurement an agent reports for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Whether the workload completed normally
    pub success: bool,
    /// Seconds from start to completion
    pub elapsed_secs: f64,
    /// Battery drained during the run, in percentage points
    pub battery_drain: Option<f64>,
    /// Peak temperature in °C
    pub max_temperature: Option<f64>,
}

impl ResultPayload {
    /// A successful result carrying only elapsed time
    pub fn elapsed(elapsed_secs: f64) -> Self {
        Self {
            success: true,
            elapsed_secs,
            battery_drain: None,
            max_temperature: None,
        }
    }

    /// Read the value a scenario is judged on
    pub fn measurement(&self, measurement: Measurement) -> Option<f64> {
        match measurement {
            Measurement::ElapsedTime => Some(self.elapsed_secs),
            Measurement::BatteryDrain => self.battery_drain,
            Measurement::PeakTemperature => self.max_temperature,
        }
    }
}

/// Protocol messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Agent registration.
    ///
    /// Sent by the agent immediately after connecting to identify itself.
    /// The orchestrator responds with `RegisterAck`.
    Register {
        /// Which device class this agent measures
        participant: ParticipantId,
        /// Hostname of the agent machine
        hostname: String,
        /// Operating system (e.g., "linux", "windows")
        os: String,
        /// CPU architecture (e.g., "x86_64", "aarch64")
        arch: String,
        /// Protocol version (e.g., "1.0")
        version: Option<String>,
    },

    /// Registration acknowledgment
    RegisterAck {
        /// Whether registration was accepted
        accepted: bool,
        /// Welcome text when accepted, reason when not
        message: String,
    },

    /// Periodic metrics reading
    MetricsSample {
        participant: ParticipantId,
        metrics: Metrics,
        /// Agent clock, milliseconds since the Unix epoch
        timestamp: u64,
    },

    /// Begin executing a scenario
    ScenarioStart {
        /// Orchestrator-assigned run number, echoed in progress and results
        run_id: u64,
        config: ScenarioConfig,
    },

    /// Abandon the in-flight run
    ScenarioStop,

    /// Progress after one step
    ScenarioProgress {
        participant: ParticipantId,
        scenario: String,
        run_id: u64,
        step: u32,
        total_steps: u32,
    },

    /// Terminal result of a run
    ScenarioResult {
        participant: ParticipantId,
        scenario: String,
        run_id: u64,
        result: ResultPayload,
    },

    /// Error response
    Error {
        /// Error code
        code: ErrorCode,
        /// Human-readable message
        message: String,
    },
}

impl Message {
    /// Get the message type for this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Register { .. } => MessageType::Register,
            Message::RegisterAck { .. } => MessageType::RegisterAck,
            Message::MetricsSample { .. } => MessageType::MetricsSample,
            Message::ScenarioStart { .. } => MessageType::ScenarioStart,
            Message::ScenarioStop => MessageType::ScenarioStop,
            Message::ScenarioProgress { .. } => MessageType::ScenarioProgress,
            Message::ScenarioResult { .. } => MessageType::ScenarioResult,
            Message::Error { .. } => MessageType::Error,
        }
    }

    /// Participant named inside an agent-originated message, if any
    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Message::Register { participant, .. }
            | Message::MetricsSample { participant, .. }
            | Message::ScenarioProgress { participant, .. }
            | Message::ScenarioResult { participant, .. } => Some(*participant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for msg_type in [
            MessageType::Register,
            MessageType::RegisterAck,
            MessageType::MetricsSample,
            MessageType::ScenarioStart,
            MessageType::ScenarioStop,
            MessageType::ScenarioProgress,
            MessageType::ScenarioResult,
            MessageType::Error,
        ] {
            let byte = msg_type.as_u8();
            let recovered = MessageType::from_u8(byte).unwrap();
            assert_eq!(recovered, msg_type);
        }
        assert_eq!(MessageType::from_u8(0x42), None);
    }

    #[test]
    fn test_measurement_selection() {
        let result = ResultPayload {
            success: true,
            elapsed_secs: 180.0,
            battery_drain: Some(2.4),
            max_temperature: None,
        };
        assert_eq!(result.measurement(Measurement::ElapsedTime), Some(180.0));
        assert_eq!(result.measurement(Measurement::BatteryDrain), Some(2.4));
        assert_eq!(result.measurement(Measurement::PeakTemperature), None);
    }

    #[test]
    fn test_zero_steps_still_runs_once() {
        let config = ScenarioConfig {
            name: "ai_showdown".into(),
            duration_secs: 10,
            step_count: 0,
            params: Params::new(),
        };
        assert_eq!(config.total_steps(), 1);
    }

    #[test]
    fn test_participant_of_message() {
        let msg = Message::ScenarioResult {
            participant: ParticipantId::Intel,
            scenario: "ai_showdown".into(),
            run_id: 1,
            result: ResultPayload::elapsed(30.0),
        };
        assert_eq!(msg.participant(), Some(ParticipantId::Intel));
        assert_eq!(Message::ScenarioStop.participant(), None);
    }
}
