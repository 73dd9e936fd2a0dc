//! Per-match live state
//!
//! `LiveMatch` is the aggregate the registry locks as a unit; every field
//! here mutates only under that entry lock.

use chrono::{DateTime, Utc};
use matchmaking::events::MatchFormed;
use types::errors::SessionError;
use types::ids::{CourseId, MatchId, PlayerId, ShipId};
use types::rating::Rating;
use types::session::{CompletedRace, FinishedParticipant, MatchStatus};
use types::telemetry::ShipTelemetry;

use std::collections::BTreeMap;

/// Volatile per-participant state, keyed by (match, player).
#[derive(Debug, Clone)]
pub struct ParticipantState {
    pub player: PlayerId,
    pub ship: ShipId,
    /// Pre-race rating snapshot carried from the queue entry.
    pub rating: Rating,
    pub connected: bool,
    pub ready: bool,
    /// Last telemetry frame received while racing.
    pub telemetry: Option<ShipTelemetry>,
    /// Frame captured at disconnect, restored on reconnect.
    pub saved_telemetry: Option<ShipTelemetry>,
    /// Seconds from race start; None until the player crosses the line.
    pub finish_time: Option<f64>,
    /// Client-reported final position, recorded for the history row.
    pub finish_position: Option<u32>,
    pub dnf: bool,
    /// Present only while the player is inside the reconnect grace window.
    pub disconnected_at: Option<DateTime<Utc>>,
    pub replay: Option<serde_json::Value>,
}

impl ParticipantState {
    fn new(player: PlayerId, ship: ShipId, rating: Rating) -> Self {
        Self {
            player,
            ship,
            rating,
            connected: true,
            ready: false,
            telemetry: None,
            saved_telemetry: None,
            finish_time: None,
            finish_position: None,
            dnf: false,
            disconnected_at: None,
            replay: None,
        }
    }

    /// Finished or written off.
    pub fn is_done(&self) -> bool {
        self.finish_time.is_some() || self.dnf
    }

    /// In the grace window: disconnected but not yet written off.
    pub fn is_in_grace(&self) -> bool {
        !self.connected && !self.dnf
    }
}

/// One in-progress race.
#[derive(Debug)]
pub struct LiveMatch {
    pub id: MatchId,
    pub course: CourseId,
    pub status: MatchStatus,
    /// BTreeMap for deterministic participant iteration.
    pub participants: BTreeMap<PlayerId, ParticipantState>,
    pub capacity: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Set once the outcome pipeline is done with this match (or there is
    /// nothing to finalize); gates the reap sweep.
    pub finalized: bool,
}

impl LiveMatch {
    /// Build a `Forming` match from the queue's handoff.
    pub fn from_formed(formed: &MatchFormed) -> Self {
        let participants: BTreeMap<PlayerId, ParticipantState> = formed
            .participants
            .iter()
            .map(|p| (p.player, ParticipantState::new(p.player, p.ship, p.rating)))
            .collect();
        let capacity = participants.len();
        Self {
            id: formed.match_id,
            course: formed.course,
            status: MatchStatus::Forming,
            participants,
            capacity,
            created_at: formed.formed_at,
            started_at: None,
            ended_at: None,
            finalized: false,
        }
    }

    /// Monotonic transition guard.
    pub fn transition(&mut self, next: MatchStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{next:?}"),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn participant(&self, player: PlayerId) -> Option<&ParticipantState> {
        self.participants.get(&player)
    }

    pub fn participant_mut(&mut self, player: PlayerId) -> Option<&mut ParticipantState> {
        self.participants.get_mut(&player)
    }

    pub fn all_ready(&self) -> bool {
        self.participants.values().all(|p| p.ready)
    }

    pub fn ready_count(&self) -> usize {
        self.participants.values().filter(|p| p.ready).count()
    }

    pub fn all_done(&self) -> bool {
        self.participants.values().all(|p| p.is_done())
    }

    /// Participants currently inside the grace window.
    pub fn disconnected_count(&self) -> usize {
        self.participants.values().filter(|p| p.is_in_grace()).count()
    }

    /// Abort policy: more than half the field gone at once.
    pub fn past_abort_threshold(&self) -> bool {
        self.disconnected_count() * 2 > self.participants.len()
    }

    /// Completion payload for the outcome finalizer.
    pub fn to_completed(&self, ended_at: DateTime<Utc>) -> CompletedRace {
        CompletedRace {
            match_id: self.id,
            course: self.course,
            participants: self
                .participants
                .values()
                .map(|p| FinishedParticipant {
                    player: p.player,
                    ship: p.ship,
                    rating: p.rating,
                    finish_time: p.finish_time,
                    dnf: p.dnf,
                    replay: p.replay.clone(),
                })
                .collect(),
            started_at: self.started_at,
            ended_at,
        }
    }
}
