//! Matchmaking Service
//!
//! Owns everything that happens before a race starts: party formation and
//! the skill-bucketed matchmaking queue.
//!
//! **Key Invariants:**
//! - A player has at most one active queue entry
//! - Rating buckets are always consistent with queue entries (both mutate
//!   under the same mutex)
//! - A queued party is never split across two matches
//! - Cancellation is idempotent and atomic with respect to match formation
//!
//! # Architecture
//!
//! ```text
//!  Party ops          Enqueue / Cancel / Status
//!     │                        │
//! ┌───▼────────┐      ┌────────▼─────────┐
//! │PartyManager│─────▶│ MatchmakingQueue │  ← one mutex around entries,
//! └────────────┘ snap └────────┬─────────┘    buckets, status cache
//!                              │ evaluate (pure, oldest-first)
//!                     ┌────────▼─────────┐
//!                     │   MatchFormed    │──▶ session registry
//!                     └──────────────────┘
//! ```

pub mod config;
pub mod evaluation;
pub mod events;
pub mod party;
pub mod queue;

pub use config::MatchmakingConfig;
pub use party::PartyManager;
pub use queue::MatchmakingQueue;

#[cfg(test)]
pub(crate) mod testutil {
    use parking_lot::Mutex;
    use types::ids::PlayerId;
    use types::ports::Notifier;

    /// Notifier that records every emission for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    impl RecordingNotifier {
        pub fn events_named(&self, event: &str) -> usize {
            self.sent.lock().iter().filter(|(_, e, _)| e == event).count()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send_to_user(&self, player: PlayerId, event: &str, payload: serde_json::Value) {
            self.sent
                .lock()
                .push((format!("user_{player}"), event.to_string(), payload));
        }

        fn send_to_room(&self, room: &str, event: &str, payload: serde_json::Value) {
            self.sent
                .lock()
                .push((room.to_string(), event.to_string(), payload));
        }
    }
}
