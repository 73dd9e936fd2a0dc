//! Persisted race-history record layout
//!
//! Owned by the external store; the finalizer appends one record per
//! participant after a race completes.

use crate::ids::{CourseId, MatchId, PlayerId, ShipId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One participant's row in the durable race history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceHistoryRecord {
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub course_id: CourseId,
    pub ship_id: ShipId,
    /// Seconds from race start; None for a did-not-finish
    pub completion_time: Option<f64>,
    /// Final race position, 1-based
    pub position: u32,
    pub date: DateTime<Utc>,
    pub rating_delta: i32,
    pub replay: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_record_serialization() {
        let record = RaceHistoryRecord {
            player_id: PlayerId::new(),
            match_id: MatchId::new(),
            course_id: CourseId::new(),
            ship_id: ShipId::new(),
            completion_time: Some(92.4),
            position: 1,
            date: Utc::now(),
            rating_delta: 16,
            replay: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: RaceHistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.position, 1);
        assert_eq!(back.rating_delta, 16);
    }
}
