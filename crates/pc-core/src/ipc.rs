//! IPC protocol for observer (CLI/dashboard) to orchestrator communication
//!
//! Uses newline-delimited JSON over TCP on localhost (127.0.0.1). Every
//! message carries a `type` tag. Requests are answered with exactly one
//! response; events are pushed to every connected observer as they happen.

use pc_protocol::{Measurement, Metrics, ParticipantId, Primitive, ResultPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Objective;
use crate::types::{ConnectionStatus, DemoPhase, HostInfo};

/// Default IPC port
pub const DEFAULT_IPC_PORT: u16 = 5050;

/// Default IPC address observers connect to
pub fn default_ipc_address() -> String {
    format!("127.0.0.1:{}", DEFAULT_IPC_PORT)
}

/// JSON rendering of a metrics map
pub type JsonMetrics = serde_json::Map<String, serde_json::Value>;

/// IPC request from an observer to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Get orchestrator and demo status
    GetStatus,

    /// List participants and their latest metrics
    ListDevices,

    /// List configured scenarios
    ListScenarios,

    /// Get the commentary history
    GetCommentary,

    /// Start a scenario
    StartDemo { scenario: String },

    /// Abandon the current run
    StopDemo,

    /// Force a verdict with the results collected so far
    ConcludeDemo,

    /// Ping (for keepalive)
    Ping,

    /// Shutdown the orchestrator
    Shutdown,
}

/// IPC response from the orchestrator to an observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Orchestrator status
    Status(OrchestratorStatus),

    /// Participant list
    Devices { devices: Vec<DeviceInfo> },

    /// Scenario catalogue
    Scenarios { scenarios: Vec<ScenarioInfo> },

    /// Commentary history, oldest first
    Commentary { entries: Vec<CommentaryEntry> },

    /// Run accepted and dispatched
    DemoStarted {
        scenario: String,
        run_id: u64,
        /// Participants the start command reached
        dispatched: Vec<ParticipantId>,
    },

    /// Generic success
    Ok,

    /// Error response
    Error { message: String },

    /// Pong response
    Pong,
}

/// IPC event pushed from the orchestrator to every observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcEvent {
    /// Fresh metrics from a participant
    MetricsBroadcast {
        device: ParticipantId,
        metrics: JsonMetrics,
        timestamp: u64,
    },

    /// Participant connected or disconnected
    DeviceStatus {
        device: ParticipantId,
        status: ConnectionStatus,
        timestamp: u64,
    },

    /// New commentary line
    CommentaryUpdate(CommentaryEntry),

    /// A run began
    ScenarioStarted {
        scenario: String,
        run_id: u64,
        loading_message: String,
        duration_secs: u64,
        timestamp: u64,
    },

    /// Step completed on one participant
    ScenarioProgress {
        device: ParticipantId,
        scenario: String,
        run_id: u64,
        step: u32,
        total_steps: u32,
        fraction: f64,
    },

    /// Run abandoned without a verdict
    ScenarioStopped {
        scenario: Option<String>,
        run_id: Option<u64>,
        timestamp: u64,
    },

    /// Verdict for a run
    WinnerDeclared(Verdict),
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub scenario: String,
    pub run_id: u64,
    /// None when every participant lost
    pub winner: Option<ParticipantId>,
    /// Margin between winner and runner-up
    pub ratio: Option<f64>,
    pub message: String,
    /// Every expected participant in canonical order
    pub standings: Vec<Standing>,
    pub timestamp: u64,
}

/// One participant's score in a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub device: ParticipantId,
    /// Measured value, absent for a loss
    pub value: Option<f64>,
    /// Missing, failed or unmeasurable result
    pub lost: bool,
}

/// Orchestrator status information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    /// Whether orchestrator is running
    pub running: bool,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Orchestrator version
    pub version: String,
    /// Agent listener address
    pub bind_address: String,
    /// Number of connected participants
    pub connected_count: usize,
    /// Scenario state
    pub demo: DemoStatus,
}

/// Scenario state machine snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoStatus {
    pub active: bool,
    pub phase: DemoPhase,
    pub current_scenario: Option<String>,
    pub run_id: Option<u64>,
    /// Milliseconds since the Unix epoch
    pub started_at: Option<u64>,
    pub results: Vec<ResultEntry>,
}

/// A result collected for the current run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub device: ParticipantId,
    pub result: ResultPayload,
    pub timestamp: u64,
}

/// Participant information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: ParticipantId,
    /// Display name from the device profile
    pub name: String,
    pub status: ConnectionStatus,
    /// Milliseconds since the Unix epoch
    pub last_seen: Option<u64>,
    pub host: Option<HostInfo>,
    pub metrics: Option<JsonMetrics>,
    pub specs: BTreeMap<String, String>,
}

/// Scenario catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    pub duration_secs: u64,
    pub steps: u32,
    pub measurement: Measurement,
    pub objective: Objective,
}

/// One commentary line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryEntry {
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Origin of the line (`auto` for rule-generated)
    pub kind: String,
}

impl CommentaryEntry {
    /// A rule-generated line
    pub fn auto(text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            text: text.into(),
            timestamp,
            kind: "auto".to_string(),
        }
    }
}

/// IPC message wrapper (for framing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcMessage {
    Request(IpcRequest),
    Response(IpcResponse),
    Event(IpcEvent),
}

impl IpcMessage {
    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl From<IpcRequest> for IpcMessage {
    fn from(req: IpcRequest) -> Self {
        IpcMessage::Request(req)
    }
}

impl From<IpcResponse> for IpcMessage {
    fn from(resp: IpcResponse) -> Self {
        IpcMessage::Response(resp)
    }
}

impl From<IpcEvent> for IpcMessage {
    fn from(event: IpcEvent) -> Self {
        IpcMessage::Event(event)
    }
}

/// Render a wire metrics map as plain JSON values
pub fn metrics_to_json(metrics: &Metrics) -> JsonMetrics {
    metrics
        .iter()
        .map(|(key, value)| (key.clone(), primitive_to_json(value)))
        .collect()
}

fn primitive_to_json(value: &Primitive) -> serde_json::Value {
    match value {
        Primitive::Bool(v) => serde_json::Value::Bool(*v),
        Primitive::Int(v) => serde_json::Value::from(*v),
        // Non-finite floats have no JSON form
        Primitive::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Primitive::Text(v) => serde_json::Value::String(v.clone()),
    }
}
