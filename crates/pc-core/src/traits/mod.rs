//! Core trait definitions

mod sink;
mod workload;

pub use sink::MessageSink;
pub use workload::{MetricsSource, StepContext, Workload, WorkloadFactory};
