//! Whole-pipeline flow: two solo players queue, race, and finish, and
//! their ratings move by the expected swing. Exercises the same wiring
//! the gateway bridges perform.

use matchmaking::{MatchmakingConfig, MatchmakingQueue, PartyManager};
use race_outcome::{OutcomeConfig, OutcomeFinalizer};
use session_registry::events::SessionEvent;
use session_registry::{SessionConfig, SessionRegistry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use types::errors::StoreError;
use types::history::RaceHistoryRecord;
use types::ids::{PlayerId, ShipId};
use types::ports::{MatchRecord, Notifier, RatingStore};
use types::rating::Rating;
use types::session::MatchStatus;

#[derive(Default)]
struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn send_to_user(&self, _player: PlayerId, _event: &str, _payload: serde_json::Value) {}
    fn send_to_room(&self, _room: &str, _event: &str, _payload: serde_json::Value) {}
}

#[derive(Default)]
struct MemStore {
    ratings: Mutex<HashMap<PlayerId, Rating>>,
    history: Mutex<Vec<RaceHistoryRecord>>,
}

#[async_trait::async_trait]
impl RatingStore for MemStore {
    async fn get_rating(&self, player: PlayerId) -> Result<Option<Rating>, StoreError> {
        Ok(self.ratings.lock().unwrap().get(&player).copied())
    }

    async fn apply_rating_delta(&self, player: PlayerId, delta: i32) -> Result<(), StoreError> {
        let mut ratings = self.ratings.lock().unwrap();
        let current = ratings.get(&player).copied().unwrap_or(Rating::new(1000));
        ratings.insert(player, current.apply_delta(delta));
        Ok(())
    }

    async fn append_race_history(&self, record: &RaceHistoryRecord) -> Result<(), StoreError> {
        self.history.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn create_match_record(&self, _record: &MatchRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn queue_to_rating_update_round_trip() {
    let notifier: Arc<dyn Notifier> = Arc::new(SilentNotifier);
    let store = Arc::new(MemStore::default());

    let (queue_tx, mut queue_rx) = tokio::sync::mpsc::unbounded_channel();
    let (session_tx, mut session_rx) = tokio::sync::mpsc::unbounded_channel();

    let mm_config = MatchmakingConfig::default();
    let parties = Arc::new(PartyManager::new(mm_config.clone(), notifier.clone()));
    let queue = MatchmakingQueue::new(mm_config, parties, notifier.clone(), queue_tx);
    let registry = Arc::new(SessionRegistry::new(
        SessionConfig::default(),
        notifier.clone(),
        session_tx,
    ));
    let finalizer = OutcomeFinalizer::new(OutcomeConfig::default(), store.clone(), notifier);

    // Two equally rated solo players queue up.
    let winner = PlayerId::new();
    let loser = PlayerId::new();
    store
        .ratings
        .lock()
        .unwrap()
        .extend([(winner, Rating::new(1000)), (loser, Rating::new(1000))]);

    queue.enqueue_solo(winner, Rating::new(1000), ShipId::new()).unwrap();
    queue.enqueue_solo(loser, Rating::new(1000), ShipId::new()).unwrap();

    // The formed match moves into the registry (the formation bridge).
    let formed = queue_rx.try_recv().expect("match forms at min field size");
    registry.adopt(&formed);
    let match_id = formed.match_id;

    // Both ready up and race.
    registry.mark_ready(match_id, winner).unwrap();
    registry.mark_ready(match_id, loser).unwrap();
    assert_eq!(registry.snapshot(match_id).unwrap().status, MatchStatus::InProgress);

    registry.record_finish(match_id, winner, 71.3, 1, None).unwrap();
    registry.record_finish(match_id, loser, 74.9, 2, None).unwrap();

    // Completion reaches the finalizer (the outcome bridge).
    let Some(SessionEvent::RaceCompleted(race)) = session_rx.recv().await else {
        panic!("expected RaceCompleted");
    };
    let report = finalizer.finalize(race).await;
    registry.mark_finalized(match_id);
    queue.forget_match(match_id);

    assert!(report.failed().is_empty());
    let ratings = store.ratings.lock().unwrap();
    assert_eq!(ratings[&winner], Rating::new(1016));
    assert_eq!(ratings[&loser], Rating::new(984));
    drop(ratings);

    let history = store.history.lock().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.match_id == match_id));

    // Registry lets go of the match after finalization.
    registry.reap();
    assert_eq!(registry.match_count(), 0);
}
