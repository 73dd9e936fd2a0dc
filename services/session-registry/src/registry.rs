//! The live-session registry
//!
//! Process-scoped owner of every in-progress match. Each match mutates
//! under its own map entry; in-memory transitions are synchronous and
//! never suspend, and no entry lock is held across a durable-store call
//! (completion hands an owned `CompletedRace` to the outcome pipeline).
//!
//! Timer-driven transitions (grace expiry, formation timeout) are
//! spawned tasks that re-check state under the entry lock before acting,
//! so the loser of a timer-vs-event race is a no-op.

use crate::config::SessionConfig;
use crate::events::SessionEvent;
use crate::session::LiveMatch;
use crate::snapshot::MatchSnapshot;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use matchmaking::events::MatchFormed;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use types::errors::SessionError;
use types::ids::{MatchId, PlayerId};
use types::ports::{match_room, Notifier};
use types::session::{AbortReason, MatchStatus};
use types::telemetry::ShipTelemetry;

/// Registry of live matches.
pub struct SessionRegistry {
    matches: DashMap<MatchId, LiveMatch>,
    /// Reverse index for reconnect lookup.
    by_player: DashMap<PlayerId, MatchId>,
    /// Pending grace-window expiries, abortable on reconnect.
    expiry_tasks: DashMap<(MatchId, PlayerId), AbortHandle>,
    /// Pending formation timeouts, abortable on start.
    formation_tasks: DashMap<MatchId, AbortHandle>,
    config: SessionConfig,
    notifier: Arc<dyn Notifier>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        notifier: Arc<dyn Notifier>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            matches: DashMap::new(),
            by_player: DashMap::new(),
            expiry_tasks: DashMap::new(),
            formation_tasks: DashMap::new(),
            config,
            notifier,
            events,
        }
    }

    /// Take ownership of a freshly formed match and schedule its
    /// formation timeout.
    pub fn adopt(self: &Arc<Self>, formed: &MatchFormed) {
        let m = LiveMatch::from_formed(formed);
        for player in m.participants.keys() {
            self.by_player.insert(*player, m.id);
        }
        let match_id = m.id;
        self.matches.insert(match_id, m);
        tracing::info!(match_id = %match_id, "match adopted");

        let registry = Arc::clone(self);
        let timeout = self.config.formation_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.handle_formation_timeout(match_id);
        });
        if let Some(old) = self.formation_tasks.insert(match_id, handle.abort_handle()) {
            old.abort();
        }
    }

    /// Flag a participant ready; starts the race once everyone is.
    pub fn mark_ready(&self, match_id: MatchId, player: PlayerId) -> Result<(), SessionError> {
        let mut m = self
            .matches
            .get_mut(&match_id)
            .ok_or(SessionError::MatchNotFound { match_id })?;
        if m.participant(player).is_none() {
            return Err(SessionError::NotInSession { player });
        }
        if m.status != MatchStatus::Forming {
            return Ok(());
        }
        if let Some(p) = m.participant_mut(player) {
            p.ready = true;
        }
        if m.all_ready() {
            self.start_locked(&mut m);
        } else {
            self.notifier.send_to_room(
                &match_room(match_id),
                "player_ready",
                serde_json::json!({ "player": player }),
            );
        }
        Ok(())
    }

    /// Participant-requested early start; needs a quorum of ready players.
    pub fn force_start(&self, match_id: MatchId, requester: PlayerId) -> Result<(), SessionError> {
        let mut m = self
            .matches
            .get_mut(&match_id)
            .ok_or(SessionError::MatchNotFound { match_id })?;
        if m.participant(requester).is_none() {
            return Err(SessionError::NotInSession { player: requester });
        }
        if m.status != MatchStatus::Forming {
            return Ok(());
        }
        if m.ready_count() < self.config.min_ready_to_start {
            return Err(SessionError::NotEnoughReady);
        }
        self.start_locked(&mut m);
        Ok(())
    }

    /// High-frequency path: overwrite a racer's transient state and fan
    /// it out. Never touches durable storage.
    pub fn record_update(
        &self,
        match_id: MatchId,
        player: PlayerId,
        telemetry: ShipTelemetry,
    ) -> Result<(), SessionError> {
        let mut m = self
            .matches
            .get_mut(&match_id)
            .ok_or(SessionError::NotInSession { player })?;
        if m.status != MatchStatus::InProgress {
            return Err(SessionError::NotInSession { player });
        }
        let Some(p) = m.participant_mut(player) else {
            return Err(SessionError::NotInSession { player });
        };
        p.telemetry = Some(telemetry);
        self.notifier.send_to_room(
            &match_room(match_id),
            "player_update",
            serde_json::json!({ "player": player, "telemetry": telemetry }),
        );
        Ok(())
    }

    /// Transport-level connection loss. Starts the grace window, or
    /// aborts the match when too much of the field is gone at once.
    pub fn record_disconnect(self: &Arc<Self>, match_id: MatchId, player: PlayerId) -> Result<(), SessionError> {
        let mut schedule_stamp = None;
        let mut aborted = false;
        {
            let mut m = self
                .matches
                .get_mut(&match_id)
                .ok_or(SessionError::NotInSession { player })?;
            if m.status.is_terminal() {
                return Ok(());
            }
            let Some(p) = m.participant_mut(player) else {
                return Err(SessionError::NotInSession { player });
            };
            if !p.connected || p.is_done() {
                return Ok(());
            }
            let stamp = Utc::now();
            p.connected = false;
            p.disconnected_at = Some(stamp);
            p.saved_telemetry = p.telemetry;
            tracing::debug!(match_id = %match_id, player = %player, "participant disconnected");
            self.notifier.send_to_room(
                &match_room(match_id),
                "player_disconnected",
                serde_json::json!({
                    "player": player,
                    "grace_secs": self.config.grace_window.as_secs(),
                }),
            );
            if m.past_abort_threshold() {
                self.abort_locked(&mut m, AbortReason::TooManyDisconnects);
                aborted = true;
            } else {
                schedule_stamp = Some(stamp);
            }
        }
        if aborted {
            self.cleanup_timers(match_id);
        }
        if let Some(stamp) = schedule_stamp {
            self.schedule_expiry(match_id, player, stamp);
        }
        Ok(())
    }

    /// Restore a disconnected participant inside the grace window.
    ///
    /// Returns the full match snapshot (also sent to the requester) so
    /// client state converges without replay.
    pub fn reconnect(&self, player: PlayerId) -> Result<MatchSnapshot, SessionError> {
        let match_id = *self
            .by_player
            .get(&player)
            .ok_or(SessionError::NotInSession { player })?;
        let snapshot = {
            let mut m = self
                .matches
                .get_mut(&match_id)
                .ok_or(SessionError::NotInSession { player })?;
            if m.status.is_terminal() {
                return Err(SessionError::NotInSession { player });
            }
            let Some(p) = m.participant_mut(player) else {
                return Err(SessionError::NotInSession { player });
            };
            if p.disconnected_at.is_none() {
                // Already written off, or never disconnected.
                return Err(SessionError::NotInSession { player });
            }
            p.connected = true;
            p.disconnected_at = None;
            p.telemetry = p.saved_telemetry.take();
            let restored = p.telemetry;
            self.notifier.send_to_room(
                &match_room(match_id),
                "player_reconnected",
                serde_json::json!({ "player": player, "telemetry": restored }),
            );
            MatchSnapshot::of(&m)
        };
        if let Some((_, handle)) = self.expiry_tasks.remove(&(match_id, player)) {
            handle.abort();
        }
        self.notifier.send_to_user(
            player,
            "match_state",
            serde_json::to_value(&snapshot).unwrap_or_default(),
        );
        Ok(snapshot)
    }

    /// Grace window elapsed without a reconnect. Timer-driven; the stamp
    /// comparison under the lock makes a racing reconnect win cleanly.
    pub fn expire_disconnect(&self, match_id: MatchId, player: PlayerId, stamp: DateTime<Utc>) {
        self.expiry_tasks.remove(&(match_id, player));
        let Some(mut m) = self.matches.get_mut(&match_id) else {
            return;
        };
        if m.status.is_terminal() {
            return;
        }
        let Some(p) = m.participant_mut(player) else {
            return;
        };
        if p.is_done() || p.disconnected_at != Some(stamp) {
            // Lost the race to a reconnect, a finish, or a newer
            // disconnect cycle.
            return;
        }
        p.dnf = true;
        p.disconnected_at = None;
        p.telemetry = None;
        p.saved_telemetry = None;
        tracing::info!(match_id = %match_id, player = %player, "grace window expired, marked DNF");
        self.notifier.send_to_room(
            &match_room(match_id),
            "player_timeout",
            serde_json::json!({ "player": player }),
        );
        if m.status == MatchStatus::InProgress && m.all_done() {
            self.complete_locked(&mut m);
        }
    }

    /// A racer crossed the line. Completes the match once the whole
    /// field is finished or written off.
    pub fn record_finish(
        &self,
        match_id: MatchId,
        player: PlayerId,
        finish_time: f64,
        position: u32,
        replay: Option<serde_json::Value>,
    ) -> Result<(), SessionError> {
        let mut m = self
            .matches
            .get_mut(&match_id)
            .ok_or(SessionError::NotInSession { player })?;
        if m.status != MatchStatus::InProgress {
            return Err(SessionError::NotInSession { player });
        }
        let Some(p) = m.participant_mut(player) else {
            return Err(SessionError::NotInSession { player });
        };
        if p.is_done() {
            tracing::debug!(match_id = %match_id, player = %player, "duplicate finish ignored");
            return Ok(());
        }
        p.finish_time = Some(finish_time);
        p.finish_position = Some(position);
        p.replay = replay;
        self.notifier.send_to_room(
            &match_room(match_id),
            "player_finished",
            serde_json::json!({ "player": player, "position": position, "time": finish_time }),
        );
        if m.all_done() {
            self.complete_locked(&mut m);
        }
        Ok(())
    }

    /// Point-in-time view for spectators.
    pub fn snapshot(&self, match_id: MatchId) -> Result<MatchSnapshot, SessionError> {
        self.matches
            .get(&match_id)
            .map(|m| MatchSnapshot::of(&m))
            .ok_or(SessionError::MatchNotFound { match_id })
    }

    /// The match a player currently belongs to, if any.
    pub fn match_of(&self, player: PlayerId) -> Option<MatchId> {
        self.by_player.get(&player).map(|m| *m)
    }

    /// Outcome pipeline finished with this match; it may now be reaped.
    pub fn mark_finalized(&self, match_id: MatchId) {
        if let Some(mut m) = self.matches.get_mut(&match_id) {
            m.finalized = true;
        }
    }

    /// Periodic sweep: abort stale `Forming` matches nobody readied for,
    /// and purge terminal matches whose outcome has been finalized.
    pub fn reap(&self) {
        let now = Utc::now();
        let stale_after = chrono::Duration::from_std(self.config.forming_stale_after)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));

        let mut stale: Vec<MatchId> = Vec::new();
        let mut purgeable: Vec<MatchId> = Vec::new();
        for entry in self.matches.iter() {
            let m = entry.value();
            if m.status == MatchStatus::Forming && m.ready_count() == 0 && now - m.created_at > stale_after {
                stale.push(m.id);
            } else if m.status.is_terminal() && m.finalized {
                purgeable.push(m.id);
            }
        }

        for match_id in stale {
            if let Some(mut m) = self.matches.get_mut(&match_id) {
                // Re-check under the lock: a late mark_ready wins.
                if m.status == MatchStatus::Forming && m.ready_count() == 0 {
                    self.abort_locked(&mut m, AbortReason::FormationTimeout);
                    purgeable.push(match_id);
                }
            }
            self.cleanup_timers(match_id);
        }

        for match_id in purgeable {
            self.matches.remove(&match_id);
            self.by_player.retain(|_, m| *m != match_id);
            self.cleanup_timers(match_id);
            tracing::debug!(match_id = %match_id, "match purged from registry");
        }
    }

    /// Live match count (for observability).
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    fn start_locked(&self, m: &mut LiveMatch) {
        if let Err(e) = m.transition(MatchStatus::InProgress) {
            tracing::error!(match_id = %m.id, error = %e, "start rejected");
            return;
        }
        m.started_at = Some(Utc::now());
        if let Some((_, handle)) = self.formation_tasks.remove(&m.id) {
            handle.abort();
        }
        tracing::info!(match_id = %m.id, "race started");
        self.notifier.send_to_room(
            &match_room(m.id),
            "race_started",
            serde_json::json!({ "match_id": m.id, "started_at": m.started_at }),
        );
    }

    fn complete_locked(&self, m: &mut LiveMatch) {
        if let Err(e) = m.transition(MatchStatus::Completed) {
            tracing::error!(match_id = %m.id, error = %e, "completion rejected");
            return;
        }
        let ended_at = Utc::now();
        m.ended_at = Some(ended_at);
        tracing::info!(match_id = %m.id, "race completed");
        if self
            .events
            .send(SessionEvent::RaceCompleted(m.to_completed(ended_at)))
            .is_err()
        {
            tracing::warn!(match_id = %m.id, "session event channel closed");
        }
    }

    fn abort_locked(&self, m: &mut LiveMatch, reason: AbortReason) {
        if let Err(e) = m.transition(MatchStatus::Aborted) {
            tracing::error!(match_id = %m.id, error = %e, "abort rejected");
            return;
        }
        for p in m.participants.values_mut() {
            if p.is_in_grace() {
                p.dnf = true;
                p.disconnected_at = None;
            }
        }
        m.ended_at = Some(Utc::now());
        m.finalized = true; // nothing to finalize for an aborted race
        tracing::warn!(match_id = %m.id, reason = ?reason, "match aborted");
        self.notifier.send_to_room(
            &match_room(m.id),
            "match_aborted",
            serde_json::json!({ "match_id": m.id, "reason": reason }),
        );
        if self
            .events
            .send(SessionEvent::MatchAborted {
                match_id: m.id,
                reason,
            })
            .is_err()
        {
            tracing::warn!(match_id = %m.id, "session event channel closed");
        }
    }

    fn handle_formation_timeout(self: &Arc<Self>, match_id: MatchId) {
        self.formation_tasks.remove(&match_id);
        let mut aborted = false;
        {
            let Some(mut m) = self.matches.get_mut(&match_id) else {
                return;
            };
            if m.status != MatchStatus::Forming {
                return;
            }
            if m.ready_count() >= self.config.min_ready_to_start {
                tracing::info!(match_id = %match_id, "formation timeout, forcing start");
                self.start_locked(&mut m);
            } else {
                self.abort_locked(&mut m, AbortReason::FormationTimeout);
                aborted = true;
            }
        }
        if aborted {
            self.cleanup_timers(match_id);
        }
    }

    fn schedule_expiry(self: &Arc<Self>, match_id: MatchId, player: PlayerId, stamp: DateTime<Utc>) {
        let registry = Arc::clone(self);
        let grace = self.config.grace_window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.expire_disconnect(match_id, player, stamp);
        });
        if let Some(old) = self.expiry_tasks.insert((match_id, player), handle.abort_handle()) {
            old.abort();
        }
    }

    fn cleanup_timers(&self, match_id: MatchId) {
        if let Some((_, handle)) = self.formation_tasks.remove(&match_id) {
            handle.abort();
        }
        self.expiry_tasks.retain(|(m, _), handle| {
            if *m == match_id {
                handle.abort();
                false
            } else {
                true
            }
        });
    }
}
