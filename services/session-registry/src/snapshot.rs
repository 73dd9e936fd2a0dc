//! Full-match snapshots
//!
//! Sent to a reconnecting participant (so client state converges without
//! replay) and to spectators joining mid-race.

use crate::session::LiveMatch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use types::ids::{CourseId, MatchId, PlayerId, ShipId};
use types::session::MatchStatus;
use types::telemetry::ShipTelemetry;

/// One participant as seen in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSnapshot {
    pub player: PlayerId,
    pub ship: ShipId,
    pub ready: bool,
    pub connected: bool,
    pub telemetry: Option<ShipTelemetry>,
    pub finish_time: Option<f64>,
    pub finish_position: Option<u32>,
    pub dnf: bool,
}

/// Point-in-time view of a whole match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub course: CourseId,
    pub status: MatchStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub participants: Vec<ParticipantSnapshot>,
}

impl MatchSnapshot {
    pub fn of(m: &LiveMatch) -> Self {
        Self {
            match_id: m.id,
            course: m.course,
            status: m.status,
            started_at: m.started_at,
            participants: m
                .participants
                .values()
                .map(|p| ParticipantSnapshot {
                    player: p.player,
                    ship: p.ship,
                    ready: p.ready,
                    connected: p.connected,
                    telemetry: p.telemetry,
                    finish_time: p.finish_time,
                    finish_position: p.finish_position,
                    dnf: p.dnf,
                })
                .collect(),
        }
    }
}
