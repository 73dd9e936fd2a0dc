use crate::auth::PlayerIdentity;
use crate::error::AppError;
use crate::models::{CreatePartyResponse, KickRequest, PartyMessageRequest, SetShipRequest};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::{
    Json,
    extract::{Path, State},
};
use matchmaking::party::PartyState;
use types::ids::PartyId;
use types::ports::party_room;

pub async fn create_party(
    State(state): State<AppState>,
    user: PlayerIdentity,
) -> Result<Json<CreatePartyResponse>, AppError> {
    let party_id = state.parties.create(user.player);
    state.notifier.join_room(&party_room(party_id), user.player);
    Ok(Json(CreatePartyResponse { party_id }))
}

pub async fn join_party(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<StatusCode, AppError> {
    state.parties.join(party_id, user.player)?;
    state.notifier.join_room(&party_room(party_id), user.player);
    Ok(StatusCode::OK)
}

pub async fn set_ship(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
    Json(payload): Json<SetShipRequest>,
) -> Result<StatusCode, AppError> {
    state.parties.set_ship(party_id, user.player, payload.ship_id)?;
    Ok(StatusCode::OK)
}

pub async fn kick_member(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
    Json(payload): Json<KickRequest>,
) -> Result<StatusCode, AppError> {
    state.parties.kick(party_id, user.player, payload.target)?;
    state.notifier.leave_room(&party_room(party_id), payload.target);
    Ok(StatusCode::OK)
}

pub async fn leave_party(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<StatusCode, AppError> {
    state.parties.leave(party_id, user.player)?;
    state.notifier.leave_room(&party_room(party_id), user.player);
    Ok(StatusCode::OK)
}

pub async fn add_spectator(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<StatusCode, AppError> {
    state.parties.add_spectator(party_id, user.player)?;
    state.notifier.join_room(&party_room(party_id), user.player);
    Ok(StatusCode::OK)
}

pub async fn send_message(
    State(state): State<AppState>,
    user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
    Json(payload): Json<PartyMessageRequest>,
) -> Result<StatusCode, AppError> {
    state.parties.send_message(party_id, user.player, payload.message)?;
    Ok(StatusCode::OK)
}

pub async fn get_party(
    State(state): State<AppState>,
    _user: PlayerIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<PartyState>, AppError> {
    state
        .parties
        .state(party_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Party not found: {party_id}")))
}
