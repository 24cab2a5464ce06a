//! Time utilities shared across crates

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in milliseconds.
///
/// A clock set before the epoch reads as 0.
///
/// # Examples
/// ```
/// use pc_core::time::current_time_millis;
///
/// let now = current_time_millis();
/// assert!(now > 0);
/// ```
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Calculate elapsed time in milliseconds since a given timestamp.
///
/// Returns 0 if the given time is in the future.
pub fn elapsed_millis(since: u64) -> u64 {
    current_time_millis().saturating_sub(since)
}

/// Whether `last_seen` is older than `threshold` as of `now` (all in ms)
pub fn is_stale(last_seen: u64, now: u64, threshold: Duration) -> bool {
    now.saturating_sub(last_seen) > threshold.as_millis() as u64
}

/// Seconds as a float, for durations reported to observers
pub fn millis_to_secs(millis: u64) -> f64 {
    millis as f64 / 1000.0
}
