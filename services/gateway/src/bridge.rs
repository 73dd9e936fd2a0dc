//! Event bridges
//!
//! Wires the matchmaking queue to the session registry and the session
//! registry to the outcome finalizer, keeping each core crate free of
//! direct dependencies on the next stage.

use crate::state::AppState;
use matchmaking::events::MatchFormed;
use session_registry::events::SessionEvent;
use tokio::sync::mpsc;
use types::ids::MatchId;
use types::ports::{MatchRecord, match_room, spectator_room};

pub fn spawn_bridges(
    state: AppState,
    queue_rx: mpsc::UnboundedReceiver<MatchFormed>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
) {
    tokio::spawn(formation_bridge(state.clone(), queue_rx));
    tokio::spawn(outcome_bridge(state.clone(), session_rx));
    tokio::spawn(maintenance_loop(state));
}

/// Formed matches move into the registry; bookkeeping lands in the store
/// off the hot path.
async fn formation_bridge(state: AppState, mut queue_rx: mpsc::UnboundedReceiver<MatchFormed>) {
    while let Some(formed) = queue_rx.recv().await {
        for participant in &formed.participants {
            state
                .notifier
                .join_room(&match_room(formed.match_id), participant.player);
        }
        state.registry.adopt(&formed);

        let record = MatchRecord {
            match_id: formed.match_id,
            course_id: formed.course,
            participants: formed.players(),
            created_at: formed.formed_at,
        };
        if let Err(e) = state.store.create_match_record(&record).await {
            tracing::warn!(match_id = %formed.match_id, error = %e, "match record not persisted");
        }
    }
}

/// Completed races run through the finalizer; terminal matches are
/// released everywhere once their outcome is settled.
async fn outcome_bridge(state: AppState, mut session_rx: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = session_rx.recv().await {
        match event {
            SessionEvent::RaceCompleted(race) => {
                let match_id = race.match_id;
                let report = state.finalizer.finalize(race).await;
                if !report.failed().is_empty() {
                    tracing::warn!(
                        match_id = %match_id,
                        pending = report.failed().len(),
                        "outcome persisted partially, reconciliation pending"
                    );
                }
                state.registry.mark_finalized(match_id);
                release_match(&state, match_id);
            }
            SessionEvent::MatchAborted { match_id, .. } => {
                release_match(&state, match_id);
            }
        }
    }
}

fn release_match(state: &AppState, match_id: MatchId) {
    state.queue.forget_match(match_id);
    state.notifier.drop_room(&match_room(match_id));
    state.notifier.drop_room(&spectator_room(match_id));
}

/// Periodic sweeps: registry reaping and queue max-wait fallback.
async fn maintenance_loop(state: AppState) {
    let mut interval = tokio::time::interval(state.session_config.reap_interval);
    loop {
        interval.tick().await;
        state.registry.reap();
        state.queue.sweep();
    }
}
