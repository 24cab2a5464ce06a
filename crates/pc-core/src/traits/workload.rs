//! Workload and sensor traits

use pc_protocol::{Metrics, ResultPayload, ScenarioConfig};
use std::time::Duration;

/// Position within a run, handed to each step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepContext {
    /// 1-based step number
    pub step: u32,
    /// Total steps in the run
    pub total: u32,
    /// Time since the run started
    pub elapsed: Duration,
}

impl StepContext {
    pub fn is_final(&self) -> bool {
        self.step >= self.total
    }
}

/// A stepped scenario workload.
///
/// One instance drives one run. The executor sleeps `step_interval`
/// between steps and checks for cancellation around each one.
pub trait Workload: Send {
    /// Pause between steps
    fn step_interval(&self, config: &ScenarioConfig) -> Duration {
        Duration::from_secs(config.duration_secs) / config.total_steps()
    }

    /// Perform one step. The final step returns the terminal result.
    fn step(&mut self, config: &ScenarioConfig, ctx: StepContext) -> Option<ResultPayload>;
}

/// Creates a fresh workload for each run
pub trait WorkloadFactory: Send + Sync {
    fn create(&self, config: &ScenarioConfig) -> Box<dyn Workload>;
}

/// Source of periodic metrics samples
pub trait MetricsSource: Send + Sync {
    /// Take a reading; `workload` names the scenario currently executing
    fn sample(&mut self, workload: Option<&str>) -> Metrics;
}
