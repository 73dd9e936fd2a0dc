use crate::auth::PlayerIdentity;
use crate::error::AppError;
use crate::models::{EnqueueResponse, EnqueueSoloRequest};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::{
    Json,
    extract::{Path, State},
};
use matchmaking::queue::QueueStatus;
use types::ids::PartyId;

pub async fn enqueue_solo(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Json(payload): Json<EnqueueSoloRequest>,
) -> Result<Json<EnqueueResponse>, AppError> {
    // Rating snapshot is taken here, outside any queue lock.
    let rating = state
        .store
        .get_rating(user.player)
        .await?
        .unwrap_or(state.mm_config.default_rating);
    state.queue.enqueue_solo(user.player, rating, payload.ship_id)?;
    Ok(Json(EnqueueResponse {
        status: "queued".to_string(),
    }))
}

pub async fn enqueue_party(
    State(state): State<AppState>,
    _user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<EnqueueResponse>, AppError> {
    state.queue.enqueue_party(state.store.as_ref(), party_id).await?;
    Ok(Json(EnqueueResponse {
        status: "queued".to_string(),
    }))
}

pub async fn cancel_queue(
    State(state): State<AppState>,
    user: PlayerIdentity,
) -> Result<StatusCode, AppError> {
    state.queue.cancel(user.player);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn queue_status(
    State(state): State<AppState>,
    user: PlayerIdentity,
) -> Result<Json<QueueStatus>, AppError> {
    Ok(Json(state.queue.status(user.player)))
}
