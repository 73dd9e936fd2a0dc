//! Session registry configuration

use std::time::Duration;

/// Tunables for the live-session state machine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected participant may reconnect before being
    /// marked did-not-finish.
    pub grace_window: Duration,
    /// How long a match may sit in `Forming` before it is force-started
    /// or aborted.
    pub formation_timeout: Duration,
    /// Ready players required for a forced start (timeout or participant
    /// request). Below this, a formation timeout aborts instead.
    pub min_ready_to_start: usize,
    /// `Forming` matches with zero ready players older than this are
    /// removed by the reap sweep.
    pub forming_stale_after: Duration,
    /// Cadence of the reap sweep, driven by the host service.
    pub reap_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(60),
            formation_timeout: Duration::from_secs(60),
            min_ready_to_start: 2,
            forming_stale_after: Duration::from_secs(300),
            reap_interval: Duration::from_secs(30),
        }
    }
}
