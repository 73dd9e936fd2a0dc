//! Matchmaking configuration
//!
//! Rating-bucket width bounds skill variance while oldest-first selection
//! bounds wait-time variance; both ends of that trade-off are tunable
//! here rather than hardcoded.

use std::time::Duration;
use types::ids::CourseId;
use types::rating::Rating;

/// Configuration for the party manager and matchmaking queue.
#[derive(Debug, Clone)]
pub struct MatchmakingConfig {
    /// Width of a rating bucket; entries land in `floor(rating/width)*width`.
    pub bucket_width: i32,
    /// Minimum field size for a match to form.
    pub min_players: usize,
    /// Maximum field size (also the party capacity).
    pub max_players: usize,
    /// Once any entry has waited this long, evaluation relaxes the rating
    /// constraint and selects across all buckets.
    pub max_wait: Duration,
    /// Maximum members in a party.
    pub party_capacity: usize,
    /// Bounded party chat log; oldest entries evicted past this.
    pub chat_capacity: usize,
    /// Rating assumed for players with no stored row.
    pub default_rating: Rating,
    /// Course rotation for formed matches. An empty pool mints a fresh
    /// course id per match (the caller is expected to configure one).
    pub courses: Vec<CourseId>,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            bucket_width: 200,
            min_players: 2,
            max_players: 8,
            max_wait: Duration::from_secs(60),
            party_capacity: 8,
            chat_capacity: 50,
            default_rating: Rating::new(1000),
            courses: Vec::new(),
        }
    }
}
