//! Transient in-race ship state
//!
//! The high-frequency payload each racer streams while a match is in
//! progress. Overwritten last-writer-wins in the session registry and
//! never written to durable storage.

use serde::{Deserialize, Serialize};

/// 2D vector used for course-space position and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One telemetry frame from a racing client.
///
/// `client_time` is the sender's clock in Unix milliseconds; the registry
/// stores it untouched so clients can interpolate against their own
/// timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipTelemetry {
    pub position: Vec2,
    pub velocity: Vec2,
    pub fuel: f64,
    pub client_time: i64,
}

impl ShipTelemetry {
    pub fn new(position: Vec2, velocity: Vec2, fuel: f64, client_time: i64) -> Self {
        Self {
            position,
            velocity,
            fuel,
            client_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_serialization_round_trip() {
        let frame = ShipTelemetry::new(Vec2::new(12.5, -3.0), Vec2::new(1.0, 0.0), 87.5, 1708123456789);
        let json = serde_json::to_string(&frame).unwrap();
        let back: ShipTelemetry = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, back);
    }
}
