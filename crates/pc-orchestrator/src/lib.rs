//! pc-orchestrator: championship orchestrator
//!
//! Accepts agent connections, tracks their liveness and metrics, runs
//! scenarios across every participant and declares winners. Observers
//! (CLI, dashboards) follow along over the localhost IPC interface.

pub mod commentary;
pub mod connection;
pub mod coordinator;
pub mod demo;
pub mod events;
pub mod ipc;
pub mod registry;
pub mod relay;
pub mod runtime;
pub mod server;
pub mod state;
pub mod winner;

pub use coordinator::DemoCoordinator;
pub use events::EventBus;
pub use registry::DeviceRegistry;
pub use runtime::Orchestrator;
pub use state::OrchestratorState;
