//! Bounded linear backoff for connection attempts

use std::time::Duration;

use pc_core::config::RetryConfig;

/// Linear backoff with a fixed attempt budget.
///
/// After failed attempt `n` the caller waits `n * step`; once `max_attempts`
/// attempts have failed there is no further delay and the caller gives up.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    /// Delay unit
    step: Duration,
    /// Attempts allowed in total
    max_attempts: u32,
    /// Attempts that have failed so far
    failed: u32,
}

impl LinearBackoff {
    /// Create a new backoff from configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.backoff_step, config.max_attempts)
    }

    pub fn new(step: Duration, max_attempts: u32) -> Self {
        Self {
            step,
            max_attempts: max_attempts.max(1),
            failed: 0,
        }
    }

    /// Record a failed attempt; returns the delay before the next one, or
    /// `None` when the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failed += 1;
        if self.failed >= self.max_attempts {
            return None;
        }
        Some(self.step * self.failed)
    }

    /// Failed attempts so far
    pub fn attempts(&self) -> u32 {
        self.failed
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
