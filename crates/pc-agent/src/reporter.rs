//! Periodic metrics reporting

use std::time::Duration;

use pc_core::time::current_time_millis;
use pc_core::traits::MetricsSource;
use pc_protocol::{Message, ParticipantId};

/// Turns metrics readings into `MetricsSample` messages
pub struct MetricsReporter {
    participant: ParticipantId,
    source: Box<dyn MetricsSource>,
    /// Time between samples
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(participant: ParticipantId, source: Box<dyn MetricsSource>, interval: Duration) -> Self {
        Self {
            participant,
            source,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take a sample; `workload` is the scenario executing, if any
    pub fn report(&mut self, workload: Option<&str>) -> Message {
        let metrics = self.source.sample(workload);
        tracing::trace!("Sampled {} metrics", metrics.len());
        Message::MetricsSample {
            participant: self.participant,
            metrics,
            timestamp: current_time_millis(),
        }
    }
}
