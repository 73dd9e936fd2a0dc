use crate::auth::PlayerIdentity;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use session_registry::snapshot::MatchSnapshot;
use types::ids::MatchId;
use types::ports::spectator_room;

pub async fn get_match(
    State(state): State<AppState>,
    _user: PlayerIdentity,
    Path(match_id): Path<MatchId>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(state.registry.snapshot(match_id)?))
}

/// Join the spectator fan-out and receive a point-in-time snapshot.
pub async fn spectate_match(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(match_id): Path<MatchId>,
) -> Result<Json<MatchSnapshot>, AppError> {
    let snapshot = state.registry.snapshot(match_id)?;
    state
        .notifier
        .join_room(&spectator_room(match_id), user.player);
    Ok(Json(snapshot))
}
