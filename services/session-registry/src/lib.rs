//! Session Registry Service
//!
//! Authoritative owner of in-progress races: per-participant transient
//! state, connectivity, and the disconnect/reconnect grace machinery.
//! Adopts matches formed by the matchmaking queue and emits a
//! `RaceCompleted` event exactly once per finished race.
//!
//! **Key Invariants:**
//! - Match status transitions are monotonic (Forming → InProgress →
//!   Completed, Aborted from any non-terminal state)
//! - A disconnect timestamp is present iff the player is disconnected and
//!   the grace window has not expired
//! - Timer firings re-check state under the match lock, so a reconnect
//!   racing an expiry resolves to a no-op on the losing side
//! - The high-frequency telemetry path never touches durable storage
//!
//! # Architecture
//!
//! ```text
//! MatchFormed events          client-driven ops          timers
//!        │                          │                      │
//!    ┌───▼──────────────────────────▼──────────────────────▼───┐
//!    │                    SessionRegistry                      │
//!    │   DashMap<MatchId, LiveMatch>  (one mutator per match)  │
//!    └───────────────────────────┬─────────────────────────────┘
//!                                │ RaceCompleted
//!                        ┌───────▼────────┐
//!                        │ race-outcome   │
//!                        └────────────────┘
//! ```

pub mod config;
pub mod events;
pub mod registry;
pub mod session;
pub mod snapshot;

pub use config::SessionConfig;
pub use registry::SessionRegistry;
