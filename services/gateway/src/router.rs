use crate::handlers::{party, queue, session, ws};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/parties", post(party::create_party))
        .route("/parties/:id", get(party::get_party))
        .route("/parties/:id/join", post(party::join_party))
        .route("/parties/:id/ship", post(party::set_ship))
        .route("/parties/:id/kick", post(party::kick_member))
        .route("/parties/:id/leave", post(party::leave_party))
        .route("/parties/:id/spectate", post(party::add_spectator))
        .route("/parties/:id/message", post(party::send_message))
        .route("/parties/:id/queue", post(queue::enqueue_party))
        .route("/queue/solo", post(queue::enqueue_solo))
        .route("/queue", delete(queue::cancel_queue))
        .route("/queue/status", get(queue::queue_status))
        .route("/matches/:id", get(session::get_match))
        .route("/matches/:id/spectate", post(session::spectate_match))
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
