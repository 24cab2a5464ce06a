//! pc-cli: Command-line interface for the performance championship
//!
//! Provides the `perf-championship` binary: it hosts the orchestrator,
//! joins a laptop as an agent, and drives the demo over the local IPC
//! connection.

pub mod commands;
pub mod ipc;
pub mod output;
