//! IPC client for communicating with the orchestrator
//!
//! Newline-delimited JSON over TCP on localhost. Events are pushed on the
//! same connection as responses, so the client sorts them as it reads.

mod client;

pub use client::{OrchestratorClient, StartedDemo};

pub use pc_core::ipc::{
    default_ipc_address, CommentaryEntry, DeviceInfo, IpcEvent, OrchestratorStatus,
    ScenarioInfo, Verdict, DEFAULT_IPC_PORT,
};
