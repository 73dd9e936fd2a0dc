//! Matchmaking queue
//!
//! Pool of solo players and queued parties awaiting a match. Entries,
//! rating buckets, and the matched-status cache all live behind one
//! mutex, which makes cancellation atomic with respect to match
//! formation: a cancel racing a formation either fully wins (entry gone,
//! match forms without the player) or fully loses (player is in the
//! match, cancel is a no-op).

use crate::config::MatchmakingConfig;
use crate::evaluation::{collect_groups, select_players, QueueCandidate};
use crate::events::{MatchFormed, MatchParticipant};
use crate::party::PartyManager;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use types::errors::QueueError;
use types::ids::{CourseId, MatchId, PartyId, PlayerId, ShipId};
use types::ports::{Notifier, RatingStore};
use types::rating::Rating;

/// One player's record while awaiting a match.
#[derive(Debug, Clone)]
struct QueueEntry {
    player: PlayerId,
    rating: Rating,
    ship: ShipId,
    party: Option<PartyId>,
    enqueued_at: DateTime<Utc>,
}

/// Everything the queue mutex guards.
#[derive(Default)]
struct QueueCore {
    entries: HashMap<PlayerId, QueueEntry>,
    /// Derived index: bucket key -> players queued in that rating range.
    buckets: BTreeMap<i32, BTreeSet<PlayerId>>,
    /// Last-known status cache: players whose entry was consumed by a
    /// formed match, so pending status polls observe the assignment.
    matched: HashMap<PlayerId, MatchId>,
}

impl QueueCore {
    fn insert_entry(&mut self, entry: QueueEntry, bucket_width: i32) {
        let key = entry.rating.bucket(bucket_width);
        self.buckets.entry(key).or_default().insert(entry.player);
        self.entries.insert(entry.player, entry);
    }

    fn remove_entry(&mut self, player: PlayerId, bucket_width: i32) -> Option<QueueEntry> {
        let entry = self.entries.remove(&player)?;
        let key = entry.rating.bucket(bucket_width);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&player);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
        Some(entry)
    }

    fn candidates_in_bucket(&self, key: i32) -> Vec<QueueCandidate> {
        self.buckets
            .get(&key)
            .into_iter()
            .flatten()
            .filter_map(|p| self.entries.get(p))
            .map(|e| QueueCandidate {
                player: e.player,
                party: e.party,
                enqueued_at: e.enqueued_at,
            })
            .collect()
    }

    fn all_candidates(&self) -> Vec<QueueCandidate> {
        self.entries
            .values()
            .map(|e| QueueCandidate {
                player: e.player,
                party: e.party,
                enqueued_at: e.enqueued_at,
            })
            .collect()
    }
}

/// Queue status as reported to a polling client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueueStatus {
    NotQueued,
    Searching {
        wait_secs: f64,
        players_in_bucket: usize,
        estimated_wait_secs: f64,
    },
    MatchFound {
        match_id: MatchId,
    },
}

/// The matchmaking queue.
pub struct MatchmakingQueue {
    core: Mutex<QueueCore>,
    config: MatchmakingConfig,
    parties: Arc<PartyManager>,
    notifier: Arc<dyn Notifier>,
    events: mpsc::UnboundedSender<MatchFormed>,
    course_cursor: AtomicUsize,
}

impl MatchmakingQueue {
    pub fn new(
        config: MatchmakingConfig,
        parties: Arc<PartyManager>,
        notifier: Arc<dyn Notifier>,
        events: mpsc::UnboundedSender<MatchFormed>,
    ) -> Self {
        Self {
            core: Mutex::new(QueueCore::default()),
            config,
            parties,
            notifier,
            events,
            course_cursor: AtomicUsize::new(0),
        }
    }

    /// Enqueue a solo player under a rating snapshot.
    pub fn enqueue_solo(&self, player: PlayerId, rating: Rating, ship: ShipId) -> Result<(), QueueError> {
        let formed = {
            let mut core = self.core.lock();
            if core.entries.contains_key(&player) {
                return Err(QueueError::AlreadyQueued { player });
            }
            core.matched.remove(&player);
            let entry = QueueEntry {
                player,
                rating,
                ship,
                party: None,
                enqueued_at: Utc::now(),
            };
            let key = rating.bucket(self.config.bucket_width);
            core.insert_entry(entry, self.config.bucket_width);
            tracing::debug!(player = %player, rating = %rating, bucket = key, "solo enqueued");
            self.evaluate_bucket(&mut core, key)
        };
        self.dispatch(formed);
        Ok(())
    }

    /// Enqueue every member of a party under their shared average rating.
    ///
    /// Store lookups happen before the queue mutex is taken; ratings are
    /// snapshotted here and never re-read.
    pub async fn enqueue_party(&self, store: &dyn RatingStore, party_id: PartyId) -> Result<(), QueueError> {
        let snapshot = self
            .parties
            .snapshot(party_id)
            .ok_or(QueueError::PartyNotFound { party_id })?;
        if snapshot.members.iter().any(|m| !snapshot.ships.contains_key(m)) {
            return Err(QueueError::IncompleteSelection { party_id });
        }

        let mut ratings = Vec::with_capacity(snapshot.members.len());
        for member in &snapshot.members {
            let rating = store
                .get_rating(*member)
                .await?
                .unwrap_or(self.config.default_rating);
            ratings.push(rating);
        }
        let shared = Rating::mean(&ratings).unwrap_or(self.config.default_rating);

        let formed = {
            let mut core = self.core.lock();
            if let Some(member) = snapshot.members.iter().find(|m| core.entries.contains_key(m)) {
                return Err(QueueError::AlreadyQueued { player: *member });
            }
            let enqueued_at = Utc::now();
            for member in &snapshot.members {
                core.matched.remove(member);
                let entry = QueueEntry {
                    player: *member,
                    rating: shared,
                    ship: snapshot.ships[member],
                    party: Some(party_id),
                    enqueued_at,
                };
                core.insert_entry(entry, self.config.bucket_width);
            }
            self.parties.set_queued(party_id, true);
            let key = shared.bucket(self.config.bucket_width);
            tracing::debug!(party = %party_id, rating = %shared, bucket = key, "party enqueued");
            self.evaluate_bucket(&mut core, key)
        };
        self.dispatch(formed);
        Ok(())
    }

    /// Remove a player's entry. Idempotent: a never-queued or already
    /// removed player is a silent no-op, never an error.
    pub fn cancel(&self, player: PlayerId) {
        let mut core = self.core.lock();
        let Some(entry) = core.remove_entry(player, self.config.bucket_width) else {
            return;
        };
        if let Some(party_id) = entry.party {
            let party_still_queued = core.entries.values().any(|e| e.party == Some(party_id));
            if !party_still_queued {
                self.parties.set_queued(party_id, false);
            }
        }
        tracing::debug!(player = %player, "queue entry canceled");
    }

    /// Status for a polling client.
    pub fn status(&self, player: PlayerId) -> QueueStatus {
        let core = self.core.lock();
        if let Some(match_id) = core.matched.get(&player) {
            return QueueStatus::MatchFound { match_id: *match_id };
        }
        let Some(entry) = core.entries.get(&player) else {
            return QueueStatus::NotQueued;
        };
        let wait_secs = (Utc::now() - entry.enqueued_at).num_milliseconds().max(0) as f64 / 1000.0;
        let key = entry.rating.bucket(self.config.bucket_width);
        let players_in_bucket = core.buckets.get(&key).map_or(0, |b| b.len());
        let estimated_wait_secs = (self.config.max_wait.as_secs_f64() - wait_secs).max(0.0);
        QueueStatus::Searching {
            wait_secs,
            players_in_bucket,
            estimated_wait_secs,
        }
    }

    /// Maintenance pass: once any entry has waited past `max_wait`, the
    /// rating constraint relaxes and selection runs across all buckets.
    /// Driven periodically by the host service.
    pub fn sweep(&self) {
        let formed = {
            let mut core = self.core.lock();
            let overdue = {
                let now = Utc::now();
                let max_wait = chrono::Duration::from_std(self.config.max_wait)
                    .unwrap_or_else(|_| chrono::Duration::seconds(60));
                core.entries.values().any(|e| now - e.enqueued_at > max_wait)
            };
            if !overdue {
                return;
            }
            let mut formed = Vec::new();
            loop {
                let groups = collect_groups(&core.all_candidates());
                match select_players(&groups, self.config.min_players, self.config.max_players) {
                    Some(players) => formed.push(self.form_match(&mut core, players)),
                    None => break,
                }
            }
            formed
        };
        self.dispatch(formed);
    }

    /// Drop status-cache rows for a finished match.
    pub fn forget_match(&self, match_id: MatchId) {
        self.core.lock().matched.retain(|_, m| *m != match_id);
    }

    /// Number of active entries (for observability).
    pub fn queued_count(&self) -> usize {
        self.core.lock().entries.len()
    }

    /// Run selection repeatedly over one bucket, forming as many matches
    /// as it can. Caller holds the lock; removal of entries, bucket
    /// memberships, and the status-cache update are all atomic here.
    fn evaluate_bucket(&self, core: &mut QueueCore, key: i32) -> Vec<MatchFormed> {
        let mut formed = Vec::new();
        loop {
            let groups = collect_groups(&core.candidates_in_bucket(key));
            match select_players(&groups, self.config.min_players, self.config.max_players) {
                Some(players) => formed.push(self.form_match(core, players)),
                None => break,
            }
        }
        formed
    }

    fn form_match(&self, core: &mut QueueCore, players: Vec<PlayerId>) -> MatchFormed {
        let match_id = MatchId::new();
        let mut participants = Vec::with_capacity(players.len());
        let mut parties: BTreeSet<PartyId> = BTreeSet::new();

        for player in players {
            // Selection only ever picks live entries, so this cannot miss.
            if let Some(entry) = core.remove_entry(player, self.config.bucket_width) {
                if let Some(party) = entry.party {
                    parties.insert(party);
                }
                core.matched.insert(player, match_id);
                participants.push(MatchParticipant {
                    player: entry.player,
                    ship: entry.ship,
                    rating: entry.rating,
                    party: entry.party,
                });
            }
        }
        for party in parties {
            self.parties.dissolve(party);
        }

        tracing::info!(
            match_id = %match_id,
            players = participants.len(),
            "match formed"
        );
        MatchFormed {
            match_id,
            course: self.pick_course(),
            participants,
            formed_at: Utc::now(),
        }
    }

    fn pick_course(&self) -> CourseId {
        if self.config.courses.is_empty() {
            return CourseId::new();
        }
        let i = self.course_cursor.fetch_add(1, Ordering::Relaxed);
        self.config.courses[i % self.config.courses.len()]
    }

    /// Notify participants and hand the match to the registry. Runs after
    /// the queue mutex is released.
    fn dispatch(&self, formed: Vec<MatchFormed>) {
        for m in formed {
            for participant in &m.participants {
                let opponents: Vec<&MatchParticipant> = m
                    .participants
                    .iter()
                    .filter(|p| p.player != participant.player)
                    .collect();
                self.notifier.send_to_user(
                    participant.player,
                    "match_found",
                    serde_json::json!({
                        "match_id": m.match_id,
                        "course": m.course,
                        "players": opponents
                            .iter()
                            .map(|p| serde_json::json!({ "player": p.player, "ship": p.ship }))
                            .collect::<Vec<_>>(),
                    }),
                );
            }
            if self.events.send(m).is_err() {
                tracing::warn!("match-formed channel closed; registry not listening");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingNotifier;
    use std::time::Duration;
    use types::errors::StoreError;
    use types::history::RaceHistoryRecord;
    use types::ports::MatchRecord;

    struct FixedStore {
        ratings: HashMap<PlayerId, Rating>,
    }

    #[async_trait::async_trait]
    impl RatingStore for FixedStore {
        async fn get_rating(&self, player: PlayerId) -> Result<Option<Rating>, StoreError> {
            Ok(self.ratings.get(&player).copied())
        }

        async fn apply_rating_delta(&self, _player: PlayerId, _delta: i32) -> Result<(), StoreError> {
            Ok(())
        }

        async fn append_race_history(&self, _record: &RaceHistoryRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn create_match_record(&self, _record: &MatchRecord) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Fixture {
        queue: MatchmakingQueue,
        parties: Arc<PartyManager>,
        notifier: Arc<RecordingNotifier>,
        events: mpsc::UnboundedReceiver<MatchFormed>,
    }

    fn fixture(config: MatchmakingConfig) -> Fixture {
        let notifier = Arc::new(RecordingNotifier::default());
        let parties = Arc::new(PartyManager::new(config.clone(), notifier.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        Fixture {
            queue: MatchmakingQueue::new(config, parties.clone(), notifier.clone(), tx),
            parties,
            notifier,
            events: rx,
        }
    }

    fn min3_config() -> MatchmakingConfig {
        MatchmakingConfig {
            min_players: 3,
            ..MatchmakingConfig::default()
        }
    }

    #[test]
    fn test_single_entry_per_player() {
        let f = fixture(min3_config());
        let player = PlayerId::new();
        f.queue.enqueue_solo(player, Rating::new(1000), ShipId::new()).unwrap();
        let err = f
            .queue
            .enqueue_solo(player, Rating::new(1000), ShipId::new())
            .unwrap_err();
        assert!(matches!(err, QueueError::AlreadyQueued { .. }));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let f = fixture(min3_config());
        let player = PlayerId::new();

        f.queue.cancel(player); // never queued: no-op

        f.queue.enqueue_solo(player, Rating::new(1000), ShipId::new()).unwrap();
        f.queue.cancel(player);
        f.queue.cancel(player); // second call: no-op

        assert_eq!(f.queue.status(player), QueueStatus::NotQueued);
        assert_eq!(f.queue.queued_count(), 0);
    }

    #[test]
    fn test_two_equal_solos_form_a_match() {
        // End-to-end scenario: two 1000-rated solos, min field of 2.
        let mut f = fixture(MatchmakingConfig::default());
        let a = PlayerId::new();
        let b = PlayerId::new();

        f.queue.enqueue_solo(a, Rating::new(1000), ShipId::new()).unwrap();
        assert!(matches!(f.queue.status(a), QueueStatus::Searching { .. }));

        f.queue.enqueue_solo(b, Rating::new(1000), ShipId::new()).unwrap();

        let formed = f.events.try_recv().expect("match should have formed");
        assert_eq!(formed.participants.len(), 2);

        let QueueStatus::MatchFound { match_id: ma } = f.queue.status(a) else {
            panic!("player a should observe MatchFound");
        };
        let QueueStatus::MatchFound { match_id: mb } = f.queue.status(b) else {
            panic!("player b should observe MatchFound");
        };
        assert_eq!(ma, mb);
        assert_eq!(ma, formed.match_id);
        assert_eq!(f.queue.queued_count(), 0);
    }

    #[test]
    fn test_different_buckets_do_not_match() {
        let mut f = fixture(MatchmakingConfig::default());
        f.queue
            .enqueue_solo(PlayerId::new(), Rating::new(1000), ShipId::new())
            .unwrap();
        f.queue
            .enqueue_solo(PlayerId::new(), Rating::new(1500), ShipId::new())
            .unwrap();
        assert!(f.events.try_recv().is_err(), "distant ratings must not match");
        assert_eq!(f.queue.queued_count(), 2);
    }

    #[test]
    fn test_status_reports_bucket_population() {
        let f = fixture(min3_config());
        let a = PlayerId::new();
        f.queue.enqueue_solo(a, Rating::new(1000), ShipId::new()).unwrap();
        f.queue
            .enqueue_solo(PlayerId::new(), Rating::new(1050), ShipId::new())
            .unwrap();

        let QueueStatus::Searching {
            players_in_bucket, ..
        } = f.queue.status(a)
        else {
            panic!("expected Searching");
        };
        assert_eq!(players_in_bucket, 2);
    }

    #[tokio::test]
    async fn test_party_enqueue_requires_full_selection() {
        let f = fixture(MatchmakingConfig::default());
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let party = f.parties.create(leader);
        f.parties.join(party, member).unwrap();
        f.parties.set_ship(party, leader, ShipId::new()).unwrap();
        // member has no ship

        let store = FixedStore {
            ratings: HashMap::new(),
        };
        let err = f.queue.enqueue_party(&store, party).await.unwrap_err();
        assert!(matches!(err, QueueError::IncompleteSelection { .. }));
    }

    #[tokio::test]
    async fn test_party_enqueued_under_mean_rating() {
        let mut f = fixture(MatchmakingConfig::default());
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let party = f.parties.create(leader);
        f.parties.join(party, member).unwrap();
        f.parties.set_ship(party, leader, ShipId::new()).unwrap();
        f.parties.set_ship(party, member, ShipId::new()).unwrap();

        let store = FixedStore {
            ratings: HashMap::from([(leader, Rating::new(1100)), (member, Rating::new(1300))]),
        };
        f.queue.enqueue_party(&store, party).await.unwrap();

        // Mean is 1200; a match forms with the pair at min_players=2.
        let formed = f.events.try_recv().expect("party of two forms a match");
        assert!(formed.participants.iter().all(|p| p.rating == Rating::new(1200)));
        assert!(formed.participants.iter().all(|p| p.party == Some(party)));
        // Party dissolved on merge into the match.
        assert!(f.parties.state(party).is_none());
    }

    #[tokio::test]
    async fn test_formed_match_never_splits_party() {
        let mut f = fixture(MatchmakingConfig {
            max_players: 4,
            ..MatchmakingConfig::default()
        });
        // Three-member party first, then two solos in the same bucket.
        let leader = PlayerId::new();
        let m2 = PlayerId::new();
        let m3 = PlayerId::new();
        let party = f.parties.create(leader);
        f.parties.join(party, m2).unwrap();
        f.parties.join(party, m3).unwrap();
        for p in [leader, m2, m3] {
            f.parties.set_ship(party, p, ShipId::new()).unwrap();
        }
        let store = FixedStore {
            ratings: HashMap::from([
                (leader, Rating::new(1000)),
                (m2, Rating::new(1000)),
                (m3, Rating::new(1000)),
            ]),
        };
        f.queue.enqueue_party(&store, party).await.unwrap();
        let formed = f.events.try_recv().expect("party of three meets min");
        let players = formed.players();
        assert!(players.contains(&leader) && players.contains(&m2) && players.contains(&m3));
    }

    #[test]
    fn test_match_found_notifies_each_participant_with_opponents() {
        let f = fixture(MatchmakingConfig::default());
        let a = PlayerId::new();
        let b = PlayerId::new();
        f.queue.enqueue_solo(a, Rating::new(1000), ShipId::new()).unwrap();
        f.queue.enqueue_solo(b, Rating::new(1000), ShipId::new()).unwrap();

        let sent = f.notifier.sent.lock();
        let found: Vec<_> = sent.iter().filter(|(_, e, _)| e == "match_found").collect();
        assert_eq!(found.len(), 2);
        for (_, _, payload) in found {
            let players = payload["players"].as_array().unwrap();
            assert_eq!(players.len(), 1, "each notice lists only the opponents");
        }
    }

    #[test]
    fn test_sweep_relaxes_rating_constraint() {
        let mut f = fixture(MatchmakingConfig {
            max_wait: Duration::from_secs(0),
            ..MatchmakingConfig::default()
        });
        f.queue
            .enqueue_solo(PlayerId::new(), Rating::new(1000), ShipId::new())
            .unwrap();
        f.queue
            .enqueue_solo(PlayerId::new(), Rating::new(1900), ShipId::new())
            .unwrap();
        assert!(f.events.try_recv().is_err());

        std::thread::sleep(Duration::from_millis(2));
        f.queue.sweep();
        let formed = f.events.try_recv().expect("sweep matches across buckets");
        assert_eq!(formed.participants.len(), 2);
    }

    #[test]
    fn test_forget_match_clears_status_cache() {
        let mut f = fixture(MatchmakingConfig::default());
        let a = PlayerId::new();
        let b = PlayerId::new();
        f.queue.enqueue_solo(a, Rating::new(1000), ShipId::new()).unwrap();
        f.queue.enqueue_solo(b, Rating::new(1000), ShipId::new()).unwrap();
        let formed = f.events.try_recv().unwrap();

        f.queue.forget_match(formed.match_id);
        assert_eq!(f.queue.status(a), QueueStatus::NotQueued);
        assert_eq!(f.queue.status(b), QueueStatus::NotQueued);
    }
}
