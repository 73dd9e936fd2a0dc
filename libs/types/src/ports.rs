//! Service boundaries
//!
//! The live-match core consumes two external collaborators: a durable
//! store (synchronous request/response semantics, reached through async
//! calls) and a notification fan-out (fire-and-forget). Both are modeled
//! as traits so the gateway can wire real transports while tests wire
//! in-memory fakes.

use crate::errors::StoreError;
use crate::history::RaceHistoryRecord;
use crate::ids::{CourseId, MatchId, PartyId, PlayerId};
use crate::rating::Rating;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping row written when a match forms, outside the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub course_id: CourseId,
    pub participants: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

/// The durable store consulted for ratings and written for race outcomes.
///
/// No session-level lock may be held across any of these calls.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Current stored rating for a player; None when the store has no row
    /// (new players fall back to the configured default).
    async fn get_rating(&self, player: PlayerId) -> Result<Option<Rating>, StoreError>;

    /// Apply a post-race rating delta.
    async fn apply_rating_delta(&self, player: PlayerId, delta: i32) -> Result<(), StoreError>;

    /// Append one participant's race-history record.
    async fn append_race_history(&self, record: &RaceHistoryRecord) -> Result<(), StoreError>;

    /// Persist match bookkeeping at formation time.
    async fn create_match_record(&self, record: &MatchRecord) -> Result<(), StoreError>;
}

/// Notification fan-out exposed by the transport layer.
///
/// Fire-and-forget: delivery failure must never roll back a state
/// transition, so these methods return nothing and must not block.
pub trait Notifier: Send + Sync {
    fn send_to_user(&self, player: PlayerId, event: &str, payload: serde_json::Value);
    fn send_to_room(&self, room: &str, event: &str, payload: serde_json::Value);
}

/// Room for a party's members and spectators.
pub fn party_room(party: PartyId) -> String {
    format!("party_{party}")
}

/// Room for a match's participants.
pub fn match_room(match_id: MatchId) -> String {
    format!("match_{match_id}")
}

/// Room for a match's spectators.
pub fn spectator_room(match_id: MatchId) -> String {
    format!("match_{match_id}_spectators")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_names_are_deterministic() {
        let id = MatchId::new();
        assert_eq!(match_room(id), match_room(id));
        assert_eq!(match_room(id), format!("match_{id}"));
        assert_eq!(spectator_room(id), format!("match_{id}_spectators"));
    }

    #[test]
    fn test_party_and_match_rooms_never_collide() {
        let uuid = uuid::Uuid::now_v7();
        let party = PartyId::from_uuid(uuid);
        let m = MatchId::from_uuid(uuid);
        assert_ne!(party_room(party), match_room(m));
    }
}
