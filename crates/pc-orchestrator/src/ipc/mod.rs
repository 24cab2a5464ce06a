//! IPC server for observer communication
//!
//! Provides the localhost JSON-lines server that the CLI and dashboards
//! use to query the orchestrator, drive demos and receive live events.

mod server;

pub use server::IpcServer;
