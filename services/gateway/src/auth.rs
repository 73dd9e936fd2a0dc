//! Player identity extraction
//!
//! Authentication itself lives upstream of this service; requests arrive
//! with a pre-verified `x-player-id` header set by the web layer. This
//! extractor only parses it.

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use types::ids::PlayerId;
use uuid::Uuid;

pub struct PlayerIdentity {
    pub player: PlayerId,
}

#[async_trait]
impl<S> FromRequestParts<S> for PlayerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-player-id")
            .ok_or_else(|| AppError::Unauthorized("Missing x-player-id header".into()))?;
        let raw = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid x-player-id header".into()))?;
        let uuid = Uuid::parse_str(raw)
            .map_err(|_| AppError::Unauthorized("Malformed player id".into()))?;
        Ok(PlayerIdentity {
            player: PlayerId::from_uuid(uuid),
        })
    }
}
