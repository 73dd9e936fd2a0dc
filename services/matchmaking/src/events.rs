//! Event structures emitted by the matchmaking queue
//!
//! A `MatchFormed` event is the atomic handoff from the queue to the
//! session registry: by the time it is emitted, every involved queue
//! entry and bucket membership is already gone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::ids::{CourseId, MatchId, PartyId, PlayerId, ShipId};
use types::rating::Rating;

/// One participant in a freshly formed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchParticipant {
    pub player: PlayerId,
    pub ship: ShipId,
    /// Rating snapshot taken at enqueue time; carried through the live
    /// session so the rating calculator never re-reads the store.
    pub rating: Rating,
    pub party: Option<PartyId>,
}

/// Emitted once per formed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFormed {
    pub match_id: MatchId,
    pub course: CourseId,
    pub participants: Vec<MatchParticipant>,
    pub formed_at: DateTime<Utc>,
}

impl MatchFormed {
    /// Player ids in participant order.
    pub fn players(&self) -> Vec<PlayerId> {
        self.participants.iter().map(|p| p.player).collect()
    }
}
