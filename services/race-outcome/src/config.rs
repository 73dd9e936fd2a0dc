//! Outcome pipeline configuration

use std::time::Duration;

/// Tunables for rating computation and persistence retries.
#[derive(Debug, Clone)]
pub struct OutcomeConfig {
    /// Elo K-factor.
    pub k_factor: f64,
    /// Persistence attempts per participant before giving up.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}
