//! Race Outcome Service
//!
//! Turns a completed race into rating adjustments and durable history:
//! a pure Elo-style calculator generalized to an N-player field, and an
//! async finalizer that persists per participant with bounded backoff
//! and notifies each racer privately.
//!
//! **Key Invariants:**
//! - All deltas are computed from one pre-race rating snapshot; no
//!   participant's delta depends on another's already-updated rating
//! - Persistence failures for one participant never block another's
//!   notification
//! - Only retryable store errors are retried

pub mod calculator;
pub mod config;
pub mod finalizer;

pub use config::OutcomeConfig;
pub use finalizer::OutcomeFinalizer;
