//! Agent-facing TCP server

mod handler;
mod listener;

pub use handler::AgentSession;
pub use listener::AgentServer;
