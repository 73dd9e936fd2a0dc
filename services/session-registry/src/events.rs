//! Events emitted by the session registry

use types::ids::MatchId;
use types::session::{AbortReason, CompletedRace};

/// Emitted on the registry's event channel for the outcome pipeline.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Every participant finished or was written off; emitted exactly
    /// once per match.
    RaceCompleted(CompletedRace),
    /// The match was torn down early. Nothing to finalize; carried for
    /// bookkeeping (queue status-cache cleanup).
    MatchAborted { match_id: MatchId, reason: AbortReason },
}
