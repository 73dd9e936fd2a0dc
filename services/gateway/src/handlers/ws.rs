//! The in-session WebSocket channel
//!
//! One socket per player. Outbound traffic is whatever the notifier
//! fans out to this player; inbound messages are the in-race commands
//! (ready, telemetry, finish, reconnect, spectate). A socket closing
//! mid-race is a disconnect: the registry starts the grace window.

use crate::auth::PlayerIdentity;
use crate::error::AppError;
use crate::models::ClientMessage;
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::StreamExt;
use types::ids::PlayerId;
use types::ports::{Notifier, spectator_room};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: PlayerIdentity,
) -> Result<Response, AppError> {
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user.player)))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, player: PlayerId) {
    let mut outbound = state.notifier.register(player);

    // A connection from a player with a session in its grace window is a
    // reconnect; the registry pushes the full snapshot through the
    // channel just registered.
    if state.registry.reconnect(player).is_ok() {
        tracing::info!(player = %player, "player reconnected to live session");
    }

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_message(&state, player, &text),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.notifier.unregister(player);
    // Socket gone mid-session: start the grace window.
    if let Some(match_id) = state.registry.match_of(player) {
        if let Err(e) = state.registry.record_disconnect(match_id, player) {
            tracing::debug!(player = %player, error = %e, "disconnect outside live session");
        }
    }
}

fn handle_message(state: &AppState, player: PlayerId, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(player = %player, error = %e, "unparseable client message");
            return;
        }
    };

    // Validation failures surface to the client on their own channel;
    // they never tear down the socket.
    let result = match message {
        ClientMessage::Ready { match_id } => state.registry.mark_ready(match_id, player),
        ClientMessage::ForceStart { match_id } => state.registry.force_start(match_id, player),
        ClientMessage::Update { match_id, telemetry } => {
            state.registry.record_update(match_id, player, telemetry)
        }
        ClientMessage::Finish {
            match_id,
            time,
            position,
            replay,
        } => state
            .registry
            .record_finish(match_id, player, time, position, replay),
        ClientMessage::Reconnect => state.registry.reconnect(player).map(|_| ()),
        ClientMessage::Spectate { match_id } => match state.registry.snapshot(match_id) {
            Ok(snapshot) => {
                state.notifier.join_room(&spectator_room(match_id), player);
                state.notifier.send_to_user(
                    player,
                    "match_state",
                    serde_json::to_value(&snapshot).unwrap_or_default(),
                );
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        state.notifier.send_to_user(
            player,
            "command_rejected",
            serde_json::json!({ "reason": e.to_string() }),
        );
    }
}
