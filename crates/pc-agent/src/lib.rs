//! pc-agent: measurement agent for the performance championship
//!
//! The agent runs on each participating laptop. It connects to the
//! orchestrator, streams metrics and executes the scenarios it is sent,
//! reporting per-step progress and one terminal result per run.

pub mod agent;
pub mod executor;
pub mod metrics;
pub mod platform;
pub mod reporter;
pub mod state;
pub mod tunnel;
pub mod workload;

pub use agent::Agent;
pub use executor::Executor;
pub use state::AgentState;
