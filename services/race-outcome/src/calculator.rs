//! Rating calculation
//!
//! Pairwise Elo generalized to an N-player field. Pure: fixed inputs
//! produce identical deltas on every call, and every expected score is
//! computed from the same pre-race rating snapshot.

use types::ids::PlayerId;
use types::rating::Rating;
use types::session::FinishedParticipant;

/// A participant with their final standing resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedParticipant {
    pub player: PlayerId,
    pub rating: Rating,
    /// 1-based position in the finishing order.
    pub rank: u32,
    pub finish_time: Option<f64>,
    pub dnf: bool,
}

/// Per-participant rating adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingDelta {
    pub player: PlayerId,
    pub rank: u32,
    pub delta: i32,
}

/// Derive the finishing order for a completed field.
///
/// Finishers rank by ascending finish time; a did-not-finish ranks after
/// every finisher. Ties (equal times, or two DNFs) break by player id so
/// the order is deterministic.
pub fn finishing_order(participants: &[FinishedParticipant]) -> Vec<RankedParticipant> {
    let mut ordered: Vec<&FinishedParticipant> = participants.iter().collect();
    ordered.sort_by(|a, b| {
        a.dnf
            .cmp(&b.dnf)
            .then(
                a.finish_time
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.finish_time.unwrap_or(f64::INFINITY)),
            )
            .then(a.player.cmp(&b.player))
    });
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, p)| RankedParticipant {
            player: p.player,
            rating: p.rating,
            rank: (i + 1) as u32,
            finish_time: p.finish_time,
            dnf: p.dnf,
        })
        .collect()
}

/// Expected score of `p` against `q` from pre-race ratings.
fn expected_score(p: Rating, q: Rating) -> f64 {
    1.0 / (1.0 + 10f64.powf((q.value() - p.value()) as f64 / 400.0))
}

/// Compute every participant's rating delta from one consistent
/// snapshot, then hand them back for atomic application.
///
/// For participant p: `delta = round(K * Σ_q (actual(p,q) - expected(p,q)))`
/// where `actual` is 1 when p ranks ahead of q and 0 otherwise.
pub fn rating_deltas(field: &[RankedParticipant], k_factor: f64) -> Vec<RatingDelta> {
    field
        .iter()
        .map(|p| {
            let score: f64 = field
                .iter()
                .filter(|q| q.player != p.player)
                .map(|q| {
                    let actual = if p.rank < q.rank { 1.0 } else { 0.0 };
                    actual - expected_score(p.rating, q.rating)
                })
                .sum();
            RatingDelta {
                player: p.player,
                rank: p.rank,
                delta: (k_factor * score).round() as i32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finisher(rating: i32, finish_time: Option<f64>, dnf: bool) -> FinishedParticipant {
        FinishedParticipant {
            player: PlayerId::new(),
            ship: types::ids::ShipId::new(),
            rating: Rating::new(rating),
            finish_time,
            dnf,
            replay: None,
        }
    }

    #[test]
    fn test_two_equal_players_swing_sixteen() {
        // Equal ratings mean an expected score of 0.5 each; with K=32 the
        // winner gains 16 and the loser gives up 16.
        let participants = vec![
            finisher(1000, Some(60.0), false),
            finisher(1000, Some(65.0), false),
        ];
        let order = finishing_order(&participants);
        let deltas = rating_deltas(&order, 32.0);

        assert_eq!(deltas[0].rank, 1);
        assert_eq!(deltas[0].delta, 16);
        assert_eq!(deltas[1].rank, 2);
        assert_eq!(deltas[1].delta, -16);
    }

    #[test]
    fn test_two_player_deltas_are_exact_negatives() {
        let participants = vec![
            finisher(1340, Some(55.1), false),
            finisher(980, Some(57.9), false),
        ];
        let order = finishing_order(&participants);
        let deltas = rating_deltas(&order, 32.0);
        assert_eq!(deltas[0].delta, -deltas[1].delta);
    }

    #[test]
    fn test_underdog_win_pays_more() {
        let favorite = finisher(1400, Some(70.0), false);
        let underdog = finisher(1000, Some(60.0), false);
        let order = finishing_order(&[favorite, underdog]);
        let deltas = rating_deltas(&order, 32.0);

        let winner = &deltas[0];
        assert!(winner.delta > 16, "beating a favorite is worth more than an even win");
    }

    #[test]
    fn test_deterministic_on_repeated_calls() {
        let participants = vec![
            finisher(1100, Some(61.0), false),
            finisher(1250, Some(62.5), false),
            finisher(990, None, true),
        ];
        let order = finishing_order(&participants);
        let first = rating_deltas(&order, 32.0);
        let second = rating_deltas(&order, 32.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_finish_order_by_time_then_dnf() {
        let fast = finisher(1000, Some(59.0), false);
        let slow = finisher(1000, Some(72.0), false);
        let quit = finisher(1000, None, true);
        let order = finishing_order(&[slow.clone(), quit.clone(), fast.clone()]);

        assert_eq!(order[0].player, fast.player);
        assert_eq!(order[1].player, slow.player);
        assert_eq!(order[2].player, quit.player);
        assert!(order[2].dnf);
    }

    #[test]
    fn test_dnf_tie_breaks_by_player_id() {
        let a = finisher(1000, None, true);
        let b = finisher(1000, None, true);
        let one = finishing_order(&[a.clone(), b.clone()]);
        let two = finishing_order(&[b.clone(), a.clone()]);
        assert_eq!(one[0].player, two[0].player, "DNF ordering is input-order independent");
        assert_eq!(one[0].player, a.player.min(b.player));
    }

    #[test]
    fn test_four_player_field_favors_front() {
        let participants = vec![
            finisher(1000, Some(60.0), false),
            finisher(1000, Some(61.0), false),
            finisher(1000, Some(62.0), false),
            finisher(1000, None, true),
        ];
        let order = finishing_order(&participants);
        let deltas = rating_deltas(&order, 32.0);

        // Equal field: first beats 3 (score 3 - 1.5), last loses to 3.
        assert_eq!(deltas[0].delta, 48);
        assert_eq!(deltas[1].delta, 16);
        assert_eq!(deltas[2].delta, -16);
        assert_eq!(deltas[3].delta, -48);
    }

    #[test]
    fn test_deltas_use_pre_race_snapshot_only() {
        // If the winner's delta were applied before computing the
        // loser's, the magnitudes would diverge; symmetric inputs must
        // give symmetric outputs.
        let participants = vec![
            finisher(1200, Some(60.0), false),
            finisher(1200, Some(61.0), false),
            finisher(1200, Some(62.0), false),
        ];
        let order = finishing_order(&participants);
        let deltas = rating_deltas(&order, 32.0);
        assert_eq!(deltas[0].delta, 32);
        assert_eq!(deltas[1].delta, 0);
        assert_eq!(deltas[2].delta, -32);
    }
}
