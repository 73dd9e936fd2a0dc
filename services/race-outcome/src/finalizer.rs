//! Race outcome finalization
//!
//! Consumes a `CompletedRace`, computes deltas from the pre-race
//! snapshot, and fans out persistence per participant. Each
//! participant's store writes retry independently with bounded
//! exponential backoff; a participant whose writes ultimately fail is
//! reported for offline reconciliation while everyone still gets their
//! result notification.

use crate::calculator::{finishing_order, rating_deltas, RatingDelta};
use crate::config::OutcomeConfig;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use types::errors::StoreError;
use types::history::RaceHistoryRecord;
use types::ids::{MatchId, PlayerId};
use types::ports::{Notifier, RatingStore};
use types::session::{CompletedRace, FinishedParticipant};

/// What happened to one participant during finalization.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantOutcome {
    pub player: PlayerId,
    /// 1-based position in the derived finishing order.
    pub position: u32,
    pub finish_time: Option<f64>,
    pub dnf: bool,
    pub rating_delta: i32,
    /// False when persistence failed after every retry; the delta then
    /// awaits offline reconciliation.
    pub persisted: bool,
}

/// Summary of one finalized race.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeReport {
    pub match_id: MatchId,
    pub outcomes: Vec<ParticipantOutcome>,
}

impl OutcomeReport {
    /// Participants whose persistence needs reconciliation.
    pub fn failed(&self) -> Vec<PlayerId> {
        self.outcomes
            .iter()
            .filter(|o| !o.persisted)
            .map(|o| o.player)
            .collect()
    }
}

/// Applies a completed race to the durable store and notifies racers.
pub struct OutcomeFinalizer {
    store: Arc<dyn RatingStore>,
    notifier: Arc<dyn Notifier>,
    config: OutcomeConfig,
}

impl OutcomeFinalizer {
    pub fn new(config: OutcomeConfig, store: Arc<dyn RatingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Finalize one completed race.
    pub async fn finalize(&self, race: CompletedRace) -> OutcomeReport {
        let order = finishing_order(&race.participants);
        let deltas = rating_deltas(&order, self.config.k_factor);

        let tasks = deltas.iter().filter_map(|delta| {
            race.participants
                .iter()
                .find(|p| p.player == delta.player)
                .map(|participant| self.finalize_participant(&race, participant, delta))
        });
        let outcomes = join_all(tasks).await;

        let report = OutcomeReport {
            match_id: race.match_id,
            outcomes,
        };
        let failed = report.failed();
        if failed.is_empty() {
            tracing::info!(match_id = %race.match_id, "race finalized");
        } else {
            tracing::error!(
                match_id = %race.match_id,
                failed = ?failed,
                "race finalized with unpersisted participants, reconciliation required"
            );
        }
        report
    }

    async fn finalize_participant(
        &self,
        race: &CompletedRace,
        participant: &FinishedParticipant,
        delta: &RatingDelta,
    ) -> ParticipantOutcome {
        let player = participant.player;

        let store = Arc::clone(&self.store);
        let amount = delta.delta;
        let delta_result = self
            .with_backoff(move || {
                let store = Arc::clone(&store);
                async move { store.apply_rating_delta(player, amount).await }
            })
            .await;

        let record = RaceHistoryRecord {
            player_id: player,
            match_id: race.match_id,
            course_id: race.course,
            ship_id: participant.ship,
            completion_time: participant.finish_time,
            position: delta.rank,
            date: Utc::now(),
            rating_delta: delta.delta,
            replay: participant.replay.clone(),
        };
        let store = Arc::clone(&self.store);
        let history_result = self
            .with_backoff(move || {
                let store = Arc::clone(&store);
                let record = record.clone();
                async move { store.append_race_history(&record).await }
            })
            .await;

        let persisted = delta_result.is_ok() && history_result.is_ok();
        if let Err(e) = &delta_result {
            tracing::error!(player = %player, error = %e, "rating delta not persisted");
        }
        if let Err(e) = &history_result {
            tracing::error!(player = %player, error = %e, "history record not persisted");
        }

        // Results are announced even when persistence is deferred; the
        // stored rating catches up after reconciliation.
        self.notifier.send_to_user(
            player,
            "race_results",
            serde_json::json!({
                "match_id": race.match_id,
                "position": delta.rank,
                "time": participant.finish_time,
                "dnf": participant.dnf,
                "rating_delta": delta.delta,
            }),
        );

        ParticipantOutcome {
            player,
            position: delta.rank,
            finish_time: participant.finish_time,
            dnf: participant.dnf,
            rating_delta: delta.delta,
            persisted,
        }
    }

    /// Bounded exponential backoff around one store operation. Only
    /// retryable errors are retried.
    async fn with_backoff<T, F, Fut>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut delay = self.config.initial_backoff;
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    tracing::warn!(attempt, error = %e, "store call failed, backing off");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.max_backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
