//! Match lifecycle types
//!
//! The match status machine and the completion payload handed from the
//! session registry to the race-outcome finalizer.

use crate::ids::{CourseId, MatchId, PlayerId, ShipId};
use crate::rating::Rating;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Match status
///
/// Transitions are monotonic: `Forming → InProgress → Completed`, with
/// `Aborted` reachable from either non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Participants assembled, waiting on readiness
    Forming,
    /// Race underway
    InProgress,
    /// Every participant finished or was marked did-not-finish (terminal)
    Completed,
    /// Torn down early (terminal)
    Aborted,
}

impl MatchStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Aborted)
    }

    /// Whether a transition to `next` is legal.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        match (self, next) {
            (MatchStatus::Forming, MatchStatus::InProgress) => true,
            (MatchStatus::InProgress, MatchStatus::Completed) => true,
            (MatchStatus::Forming, MatchStatus::Aborted) => true,
            (MatchStatus::InProgress, MatchStatus::Aborted) => true,
            _ => false,
        }
    }
}

/// Why a match was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    /// Disconnected participants exceeded half the field
    TooManyDisconnects,
    /// Sat in `Forming` past the formation timeout without enough ready players
    FormationTimeout,
}

/// Snapshot of one participant at race completion.
///
/// `rating` is the pre-race snapshot carried from the queue entry — the
/// rating calculator must never see post-race values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedParticipant {
    pub player: PlayerId,
    pub ship: ShipId,
    pub rating: Rating,
    /// Seconds from race start, None for a did-not-finish
    pub finish_time: Option<f64>,
    pub dnf: bool,
    pub replay: Option<serde_json::Value>,
}

/// The completion payload emitted once per completed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRace {
    pub match_id: MatchId,
    pub course: CourseId,
    pub participants: Vec<FinishedParticipant>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!MatchStatus::Forming.is_terminal());
        assert!(!MatchStatus::InProgress.is_terminal());
        assert!(MatchStatus::Completed.is_terminal());
        assert!(MatchStatus::Aborted.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(MatchStatus::Forming.can_transition_to(MatchStatus::InProgress));
        assert!(MatchStatus::InProgress.can_transition_to(MatchStatus::Completed));
        assert!(MatchStatus::Forming.can_transition_to(MatchStatus::Aborted));
        assert!(MatchStatus::InProgress.can_transition_to(MatchStatus::Aborted));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!MatchStatus::Forming.can_transition_to(MatchStatus::Completed));
        assert!(!MatchStatus::Completed.can_transition_to(MatchStatus::Aborted));
        assert!(!MatchStatus::Aborted.can_transition_to(MatchStatus::InProgress));
        assert!(!MatchStatus::Completed.can_transition_to(MatchStatus::InProgress));
    }

    #[test]
    fn test_abort_reason_wire_format() {
        let json = serde_json::to_string(&AbortReason::TooManyDisconnects).unwrap();
        assert_eq!(json, "\"TOO_MANY_DISCONNECTS\"");
    }
}
