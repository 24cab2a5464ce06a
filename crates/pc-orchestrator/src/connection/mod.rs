//! Connection management

mod liveness;
mod pool;

pub use liveness::LivenessMonitor;
pub use pool::{AgentCommand, AgentLink, ConnectionPool};
