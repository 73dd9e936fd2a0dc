//! Match evaluation logic
//!
//! Pure selection over queued candidates: group by party, then greedily
//! combine the longest-waiting groups into a field of `min..=max`
//! players. Parties are atomic — a group either joins a match whole or
//! stays queued whole.

use chrono::{DateTime, Utc};
use types::ids::{PartyId, PlayerId};

/// Grouping key: queued parties stay together, solo players form
/// singleton groups keyed by their own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Party(PartyId),
    Solo(PlayerId),
}

/// A queue entry as seen by the selector.
#[derive(Debug, Clone, Copy)]
pub struct QueueCandidate {
    pub player: PlayerId,
    pub party: Option<PartyId>,
    pub enqueued_at: DateTime<Utc>,
}

/// A party (or singleton) awaiting selection.
#[derive(Debug, Clone)]
pub struct QueuedGroup {
    pub key: GroupKey,
    pub players: Vec<PlayerId>,
    /// Earliest enqueue time across the group's members.
    pub enqueued_at: DateTime<Utc>,
}

/// Group candidates by party id, solo players as singletons.
///
/// Output is deterministic regardless of input order: members are sorted
/// within each group and groups are sorted oldest-first (ties by key).
pub fn collect_groups(candidates: &[QueueCandidate]) -> Vec<QueuedGroup> {
    let mut groups: Vec<QueuedGroup> = Vec::new();

    for candidate in candidates {
        let key = match candidate.party {
            Some(party) => GroupKey::Party(party),
            None => GroupKey::Solo(candidate.player),
        };
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => {
                group.players.push(candidate.player);
                if candidate.enqueued_at < group.enqueued_at {
                    group.enqueued_at = candidate.enqueued_at;
                }
            }
            None => groups.push(QueuedGroup {
                key,
                players: vec![candidate.player],
                enqueued_at: candidate.enqueued_at,
            }),
        }
    }

    for group in &mut groups {
        group.players.sort();
    }
    groups.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at).then(a.key.cmp(&b.key)));
    groups
}

/// Select a field of players for one match, or None if no admissible
/// combination exists.
///
/// Greedy oldest-first: walk groups in wait order, take every group that
/// still fits under `max_players`, and form a match if the total reaches
/// `min_players`. Taking the longest-waiting groups first bounds
/// worst-case wait time; skipping oversized groups (rather than stopping)
/// lets a small late group top up a field an early large party left short.
pub fn select_players(groups: &[QueuedGroup], min_players: usize, max_players: usize) -> Option<Vec<PlayerId>> {
    let mut selected: Vec<PlayerId> = Vec::new();

    for group in groups {
        if selected.len() + group.players.len() <= max_players {
            selected.extend(group.players.iter().copied());
        }
        if selected.len() == max_players {
            break;
        }
    }

    if selected.len() >= min_players {
        Some(selected)
    } else {
        None
    }
}
