//! Connection management for reaching the orchestrator

mod connector;
mod reconnect;

pub use connector::{ActiveTunnel, TunnelConnector, TunnelEvent};
pub use reconnect::LinearBackoff;
