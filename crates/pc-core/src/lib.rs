//! pc-core: Core abstractions and configuration for the performance championship
//!
//! This crate provides shared types, traits, and configuration structures
//! used by the orchestrator, agent, and CLI components.

pub mod config;
pub mod error;
pub mod ipc;
pub mod time;
pub mod traits;
pub mod types;

pub use error::PcError;
pub use types::{ConnectionStatus, DemoPhase, HostInfo};
