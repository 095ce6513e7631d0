//! Exponential-backoff schedule for store connection attempts.
//!
//! The supervisor in [`crate::connection`] waits [`next_delay`] between
//! failed checks and resets to [`ReconnectConfig::initial_delay`] once the
//! store answers again.

use std::time::Duration;

/// How long the supervisor waits between failed connection checks.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait after the first failed check, and again after every recovery.
    pub initial_delay: Duration,
    /// Longest wait; a store that stays down is checked this often.
    pub max_delay: Duration,
    /// Growth of the wait per consecutive failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Wait to use after one more failure, given the wait just used.
/// Never exceeds `max_delay`.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}
