//! Error types for the live-match services
//!
//! Comprehensive error taxonomy using thiserror. Validation errors are
//! returned synchronously to the caller and never retried; store errors
//! carry retryability so the finalizer can back off on transient faults.

use crate::ids::{MatchId, PartyId, PlayerId};
use thiserror::Error;

/// Top-level service error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Party error: {0}")]
    Party(#[from] PartyError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Party-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartyError {
    #[error("Party not found: {party_id}")]
    PartyNotFound { party_id: PartyId },

    #[error("Party is full (capacity {capacity})")]
    PartyFull { capacity: usize },

    #[error("Player {player} is not a member of the party")]
    NotAMember { player: PlayerId },

    #[error("Player {player} is not the party leader")]
    NotLeader { player: PlayerId },

    #[error("Player {player} is already a racing member")]
    AlreadyMember { player: PlayerId },

    #[error("Player {player} may not chat in this party")]
    Unauthorized { player: PlayerId },
}

/// Matchmaking-queue errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Player {player} already has an active queue entry")]
    AlreadyQueued { player: PlayerId },

    #[error("Party {party_id} has members without a ship selection")]
    IncompleteSelection { party_id: PartyId },

    #[error("Party not found: {party_id}")]
    PartyNotFound { party_id: PartyId },

    #[error("Rating lookup failed: {0}")]
    RatingUnavailable(#[from] StoreError),
}

/// Live-session errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: MatchId },

    #[error("Player {player} is not in an eligible session")]
    NotInSession { player: PlayerId },

    #[error("Illegal match transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Not enough ready players to start")]
    NotEnoughReady,
}

/// Durable-store errors
///
/// `Unavailable` is transient and safe to retry with backoff;
/// `Rejected` is permanent and must not be retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store rejected request: {message}")]
    Rejected { message: String },
}

impl StoreError {
    /// Whether a retry with backoff can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}
