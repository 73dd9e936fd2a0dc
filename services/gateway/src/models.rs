use serde::{Deserialize, Serialize};
use types::ids::{MatchId, PartyId, PlayerId, ShipId};
use types::telemetry::ShipTelemetry;

#[derive(Debug, Clone, Serialize)]
pub struct CreatePartyResponse {
    pub party_id: PartyId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetShipRequest {
    pub ship_id: ShipId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickRequest {
    pub target: PlayerId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueSoloRequest {
    pub ship_id: ShipId,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub status: String,
}

/// Commands a client may send over the session WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ready {
        match_id: MatchId,
    },
    ForceStart {
        match_id: MatchId,
    },
    Update {
        match_id: MatchId,
        telemetry: ShipTelemetry,
    },
    Finish {
        match_id: MatchId,
        time: f64,
        position: u32,
        #[serde(default)]
        replay: Option<serde_json::Value>,
    },
    Reconnect,
    Spectate {
        match_id: MatchId,
    },
}
