//! Skill rating arithmetic
//!
//! Ratings are whole numbers. Bucket keys floor a rating to the nearest
//! multiple of the configured bucket width, so players of similar skill
//! index into the same matchmaking bucket.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A player's skill rating at a point in time.
///
/// Queue entries snapshot the rating at enqueue; the snapshot is what the
/// rating calculator consumes, never a re-read of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(i32);

impl Rating {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// Bucket key for this rating: `floor(rating / width) * width`.
    ///
    /// Width must be positive. Negative ratings floor toward negative
    /// infinity so adjacent buckets never overlap.
    pub fn bucket(&self, width: i32) -> i32 {
        self.0.div_euclid(width) * width
    }

    /// Apply a delta, saturating rather than wrapping.
    pub fn apply_delta(&self, delta: i32) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Arithmetic mean of a set of ratings, rounded to the nearest whole
    /// rating. Returns None for an empty slice.
    pub fn mean(ratings: &[Rating]) -> Option<Rating> {
        if ratings.is_empty() {
            return None;
        }
        let sum: i64 = ratings.iter().map(|r| r.0 as i64).sum();
        let avg = (sum as f64 / ratings.len() as f64).round() as i32;
        Some(Rating(avg))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
