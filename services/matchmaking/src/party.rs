//! Party management
//!
//! Short-lived group-forming state ahead of the queue: membership in
//! join order, ship selections, a bounded chat log, and spectators.
//! Each party mutates under its own map entry, so unrelated parties
//! never serialize against each other.

use crate::config::MatchmakingConfig;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use types::errors::PartyError;
use types::ids::{PartyId, PlayerId, ShipId};
use types::ports::{party_room, Notifier};

/// One chat line in a party's bounded log.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub sender: PlayerId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// A party: leader, members in join order, selections, chat, spectators.
#[derive(Debug)]
pub struct Party {
    pub id: PartyId,
    pub leader: PlayerId,
    /// Join order; index 0 is the oldest member and next in line for
    /// leadership.
    pub members: Vec<PlayerId>,
    pub ships: HashMap<PlayerId, ShipId>,
    /// Set while the party sits in the matchmaking queue.
    pub queued: bool,
    chat: VecDeque<ChatMessage>,
    pub spectators: BTreeSet<PlayerId>,
}

impl Party {
    fn new(id: PartyId, leader: PlayerId) -> Self {
        Self {
            id,
            leader,
            members: vec![leader],
            ships: HashMap::new(),
            queued: false,
            chat: VecDeque::new(),
            spectators: BTreeSet::new(),
        }
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }

    fn push_chat(&mut self, message: ChatMessage, capacity: usize) {
        self.chat.push_back(message);
        while self.chat.len() > capacity {
            self.chat.pop_front();
        }
    }
}

/// Serializable full-state view, broadcast after every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct PartyState {
    pub id: PartyId,
    pub leader: PlayerId,
    pub members: Vec<PlayerId>,
    pub ships: HashMap<PlayerId, ShipId>,
    pub queued: bool,
    pub spectators: Vec<PlayerId>,
    pub chat: Vec<ChatMessage>,
}

/// Owned snapshot the queue reads when a party enqueues.
#[derive(Debug, Clone)]
pub struct PartySnapshot {
    pub id: PartyId,
    pub members: Vec<PlayerId>,
    pub ships: HashMap<PlayerId, ShipId>,
    pub queued: bool,
}

/// Registry of live parties.
pub struct PartyManager {
    parties: DashMap<PartyId, Party>,
    notifier: Arc<dyn Notifier>,
    config: MatchmakingConfig,
}

impl PartyManager {
    pub fn new(config: MatchmakingConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            parties: DashMap::new(),
            notifier,
            config,
        }
    }

    /// Form a new party with `leader` as its only member.
    pub fn create(&self, leader: PlayerId) -> PartyId {
        let id = PartyId::new();
        let party = Party::new(id, leader);
        let state = Self::state_of(&party);
        self.parties.insert(id, party);
        tracing::debug!(party = %id, leader = %leader, "party created");
        self.broadcast(id, &state);
        id
    }

    /// Add a racer to the party.
    pub fn join(&self, party_id: PartyId, player: PlayerId) -> Result<(), PartyError> {
        let state = {
            let mut party = self
                .parties
                .get_mut(&party_id)
                .ok_or(PartyError::PartyNotFound { party_id })?;
            if party.is_member(player) {
                return Err(PartyError::AlreadyMember { player });
            }
            if party.members.len() >= self.config.party_capacity {
                return Err(PartyError::PartyFull {
                    capacity: self.config.party_capacity,
                });
            }
            party.members.push(player);
            party.spectators.remove(&player);
            Self::state_of(&party)
        };
        self.broadcast(party_id, &state);
        Ok(())
    }

    /// Record a member's ship selection.
    pub fn set_ship(&self, party_id: PartyId, player: PlayerId, ship: ShipId) -> Result<(), PartyError> {
        let state = {
            let mut party = self
                .parties
                .get_mut(&party_id)
                .ok_or(PartyError::PartyNotFound { party_id })?;
            if !party.is_member(player) {
                return Err(PartyError::NotAMember { player });
            }
            party.ships.insert(player, ship);
            Self::state_of(&party)
        };
        self.broadcast(party_id, &state);
        Ok(())
    }

    /// Leader removes a member.
    pub fn kick(&self, party_id: PartyId, requester: PlayerId, target: PlayerId) -> Result<(), PartyError> {
        let state = {
            let mut party = self
                .parties
                .get_mut(&party_id)
                .ok_or(PartyError::PartyNotFound { party_id })?;
            if party.leader != requester {
                return Err(PartyError::NotLeader { player: requester });
            }
            if !party.is_member(target) {
                return Err(PartyError::NotAMember { player: target });
            }
            party.members.retain(|m| *m != target);
            party.ships.remove(&target);
            Self::state_of(&party)
        };
        self.broadcast(party_id, &state);
        self.notifier
            .send_to_user(target, "party_kicked", serde_json::json!({ "party_id": party_id }));
        Ok(())
    }

    /// A member leaves. Leadership transfers to the next member in join
    /// order; an emptied party is destroyed.
    pub fn leave(&self, party_id: PartyId, player: PlayerId) -> Result<(), PartyError> {
        let state = {
            let mut party = self
                .parties
                .get_mut(&party_id)
                .ok_or(PartyError::PartyNotFound { party_id })?;
            if !party.is_member(player) {
                return Err(PartyError::NotAMember { player });
            }
            party.members.retain(|m| *m != player);
            party.ships.remove(&player);
            if party.leader == player {
                if let Some(next) = party.members.first() {
                    party.leader = *next;
                }
            }
            if party.members.is_empty() {
                None
            } else {
                Some(Self::state_of(&party))
            }
        };
        match state {
            Some(state) => self.broadcast(party_id, &state),
            None => {
                self.parties.remove(&party_id);
                tracing::debug!(party = %party_id, "empty party destroyed");
            }
        }
        Ok(())
    }

    /// Add a spectator; racers cannot spectate their own party.
    pub fn add_spectator(&self, party_id: PartyId, player: PlayerId) -> Result<(), PartyError> {
        let state = {
            let mut party = self
                .parties
                .get_mut(&party_id)
                .ok_or(PartyError::PartyNotFound { party_id })?;
            if party.is_member(player) {
                return Err(PartyError::AlreadyMember { player });
            }
            party.spectators.insert(player);
            Self::state_of(&party)
        };
        self.broadcast(party_id, &state);
        Ok(())
    }

    /// Append to the bounded chat log and broadcast the message.
    pub fn send_message(&self, party_id: PartyId, sender: PlayerId, text: String) -> Result<(), PartyError> {
        let message = {
            let mut party = self
                .parties
                .get_mut(&party_id)
                .ok_or(PartyError::PartyNotFound { party_id })?;
            if !party.is_member(sender) && !party.spectators.contains(&sender) {
                return Err(PartyError::Unauthorized { player: sender });
            }
            let message = ChatMessage {
                sender,
                text,
                sent_at: Utc::now(),
            };
            party.push_chat(message.clone(), self.config.chat_capacity);
            message
        };
        self.notifier.send_to_room(
            &party_room(party_id),
            "party_message",
            serde_json::to_value(&message).unwrap_or_default(),
        );
        Ok(())
    }

    /// Owned view for the queue's enqueue path.
    pub fn snapshot(&self, party_id: PartyId) -> Option<PartySnapshot> {
        self.parties.get(&party_id).map(|party| PartySnapshot {
            id: party.id,
            members: party.members.clone(),
            ships: party.ships.clone(),
            queued: party.queued,
        })
    }

    /// Full serializable state, if the party exists.
    pub fn state(&self, party_id: PartyId) -> Option<PartyState> {
        self.parties.get(&party_id).map(|party| Self::state_of(&party))
    }

    /// Flip the queued flag (set on enqueue, cleared on cancel).
    pub fn set_queued(&self, party_id: PartyId, queued: bool) {
        if let Some(mut party) = self.parties.get_mut(&party_id) {
            party.queued = queued;
        }
    }

    /// Remove a party merged into a formed match. No farewell broadcast:
    /// the match-found notification supersedes it.
    pub fn dissolve(&self, party_id: PartyId) {
        if self.parties.remove(&party_id).is_some() {
            tracing::debug!(party = %party_id, "party dissolved into match");
        }
    }

    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    fn state_of(party: &Party) -> PartyState {
        PartyState {
            id: party.id,
            leader: party.leader,
            members: party.members.clone(),
            ships: party.ships.clone(),
            queued: party.queued,
            spectators: party.spectators.iter().copied().collect(),
            chat: party.chat.iter().cloned().collect(),
        }
    }

    fn broadcast(&self, party_id: PartyId, state: &PartyState) {
        self.notifier.send_to_room(
            &party_room(party_id),
            "party_updated",
            serde_json::to_value(state).unwrap_or_default(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingNotifier;

    fn manager() -> (PartyManager, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (
            PartyManager::new(MatchmakingConfig::default(), notifier.clone()),
            notifier,
        )
    }

    #[test]
    fn test_create_makes_leader_a_member() {
        let (manager, _) = manager();
        let leader = PlayerId::new();
        let party = manager.create(leader);

        let state = manager.state(party).unwrap();
        assert_eq!(state.leader, leader);
        assert_eq!(state.members, vec![leader]);
    }

    #[test]
    fn test_join_respects_capacity() {
        let (manager, _) = manager();
        let config_cap = MatchmakingConfig::default().party_capacity;
        let party = manager.create(PlayerId::new());

        for _ in 1..config_cap {
            manager.join(party, PlayerId::new()).unwrap();
        }
        let err = manager.join(party, PlayerId::new()).unwrap_err();
        assert!(matches!(err, PartyError::PartyFull { .. }));
    }

    #[test]
    fn test_join_twice_rejected() {
        let (manager, _) = manager();
        let party = manager.create(PlayerId::new());
        let player = PlayerId::new();
        manager.join(party, player).unwrap();
        let err = manager.join(party, player).unwrap_err();
        assert!(matches!(err, PartyError::AlreadyMember { .. }));
    }

    #[test]
    fn test_set_ship_requires_membership() {
        let (manager, _) = manager();
        let party = manager.create(PlayerId::new());
        let outsider = PlayerId::new();
        let err = manager.set_ship(party, outsider, ShipId::new()).unwrap_err();
        assert!(matches!(err, PartyError::NotAMember { .. }));
    }

    #[test]
    fn test_kick_requires_leadership() {
        let (manager, notifier) = manager();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let party = manager.create(leader);
        manager.join(party, member).unwrap();

        let err = manager.kick(party, member, leader).unwrap_err();
        assert!(matches!(err, PartyError::NotLeader { .. }));

        manager.kick(party, leader, member).unwrap();
        let state = manager.state(party).unwrap();
        assert_eq!(state.members, vec![leader]);
        assert_eq!(notifier.events_named("party_kicked"), 1);
    }

    #[test]
    fn test_leadership_transfers_in_join_order() {
        let (manager, _) = manager();
        let leader = PlayerId::new();
        let second = PlayerId::new();
        let third = PlayerId::new();
        let party = manager.create(leader);
        manager.join(party, second).unwrap();
        manager.join(party, third).unwrap();

        manager.leave(party, leader).unwrap();
        let state = manager.state(party).unwrap();
        assert_eq!(state.leader, second, "oldest remaining member leads");
        assert!(state.members.contains(&state.leader), "leader stays a member");
    }

    #[test]
    fn test_last_member_leaving_destroys_party() {
        let (manager, _) = manager();
        let leader = PlayerId::new();
        let party = manager.create(leader);

        manager.leave(party, leader).unwrap();
        assert!(manager.state(party).is_none());
        assert_eq!(manager.party_count(), 0);
    }

    #[test]
    fn test_leader_invariant_over_random_ops() {
        let (manager, _) = manager();
        let players: Vec<PlayerId> = (0..5).map(|_| PlayerId::new()).collect();
        let party = manager.create(players[0]);
        for p in &players[1..] {
            manager.join(party, *p).unwrap();
        }

        manager.leave(party, players[0]).unwrap();
        manager.kick(party, players[1], players[3]).unwrap();
        manager.leave(party, players[2]).unwrap();

        let state = manager.state(party).unwrap();
        assert!(state.members.contains(&state.leader));
    }

    #[test]
    fn test_spectator_rules() {
        let (manager, _) = manager();
        let leader = PlayerId::new();
        let party = manager.create(leader);

        let err = manager.add_spectator(party, leader).unwrap_err();
        assert!(matches!(err, PartyError::AlreadyMember { .. }));

        let watcher = PlayerId::new();
        manager.add_spectator(party, watcher).unwrap();
        let state = manager.state(party).unwrap();
        assert!(state.spectators.contains(&watcher));
    }

    #[test]
    fn test_chat_requires_membership_or_spectating() {
        let (manager, notifier) = manager();
        let leader = PlayerId::new();
        let watcher = PlayerId::new();
        let stranger = PlayerId::new();
        let party = manager.create(leader);
        manager.add_spectator(party, watcher).unwrap();

        manager.send_message(party, leader, "gl".into()).unwrap();
        manager.send_message(party, watcher, "hf".into()).unwrap();
        let err = manager.send_message(party, stranger, "hi".into()).unwrap_err();
        assert!(matches!(err, PartyError::Unauthorized { .. }));
        assert_eq!(notifier.events_named("party_message"), 2);
    }

    #[test]
    fn test_chat_log_is_bounded() {
        let notifier = Arc::new(RecordingNotifier::default());
        let config = MatchmakingConfig {
            chat_capacity: 3,
            ..MatchmakingConfig::default()
        };
        let manager = PartyManager::new(config, notifier);
        let leader = PlayerId::new();
        let party = manager.create(leader);

        for i in 0..5 {
            manager.send_message(party, leader, format!("msg {i}")).unwrap();
        }
        let state = manager.state(party).unwrap();
        assert_eq!(state.chat.len(), 3);
        assert_eq!(state.chat[0].text, "msg 2", "oldest entries evicted");
    }

    #[test]
    fn test_every_mutation_broadcasts_state() {
        let (manager, notifier) = manager();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let party = manager.create(leader);
        manager.join(party, member).unwrap();
        manager.set_ship(party, member, ShipId::new()).unwrap();
        manager.leave(party, member).unwrap();

        // create + join + set_ship + leave
        assert_eq!(notifier.events_named("party_updated"), 4);
    }
}
