//! WebSocket notification fan-out
//!
//! Implements the core's `Notifier` port over per-player unbounded
//! channels plus room membership sets. Sends are fire-and-forget: a
//! closed or missing channel is dropped silently, never an error.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use types::ids::PlayerId;
use types::ports::Notifier;

/// One event as delivered to a client socket.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Room-aware fan-out registry.
pub struct WsNotifier {
    users: DashMap<PlayerId, mpsc::UnboundedSender<ServerEvent>>,
    rooms: DashMap<String, BTreeSet<PlayerId>>,
}

impl WsNotifier {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    /// Attach a player's socket; a previous channel is replaced.
    pub fn register(&self, player: PlayerId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.users.insert(player, tx);
        rx
    }

    /// Detach on socket close. Room memberships survive so a reconnect
    /// resumes the same fan-out.
    pub fn unregister(&self, player: PlayerId) {
        self.users.remove(&player);
    }

    pub fn join_room(&self, room: &str, player: PlayerId) {
        self.rooms.entry(room.to_string()).or_default().insert(player);
    }

    pub fn leave_room(&self, room: &str, player: PlayerId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&player);
        }
    }

    /// Tear down a room once its match or party is gone.
    pub fn drop_room(&self, room: &str) {
        self.rooms.remove(room);
    }

    pub fn connected_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for WsNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for WsNotifier {
    fn send_to_user(&self, player: PlayerId, event: &str, payload: serde_json::Value) {
        if let Some(tx) = self.users.get(&player) {
            let _ = tx.send(ServerEvent {
                event: event.to_string(),
                payload,
            });
        }
    }

    fn send_to_room(&self, room: &str, event: &str, payload: serde_json::Value) {
        let members: Vec<PlayerId> = match self.rooms.get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };
        for player in members {
            self.send_to_user(player, event, payload.clone());
        }
    }
}
