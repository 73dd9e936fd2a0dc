mod auth;
mod bridge;
mod error;
mod handlers;
mod models;
mod notifier;
mod router;
mod state;
mod store;

use matchmaking::{MatchmakingConfig, MatchmakingQueue, PartyManager};
use notifier::WsNotifier;
use race_outcome::{OutcomeConfig, OutcomeFinalizer};
use router::create_router;
use session_registry::{SessionConfig, SessionRegistry};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use store::HttpRatingStore;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use types::ports::{Notifier, RatingStore};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("Starting live-match gateway");

    let store_url =
        std::env::var("STORE_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let mm_config = MatchmakingConfig::default();
    let session_config = SessionConfig::default();

    let notifier = Arc::new(WsNotifier::new());
    let notifier_dyn: Arc<dyn Notifier> = notifier.clone();
    let store: Arc<dyn RatingStore> = Arc::new(HttpRatingStore::new(store_url));

    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (session_tx, session_rx) = mpsc::unbounded_channel();

    let parties = Arc::new(PartyManager::new(mm_config.clone(), notifier_dyn.clone()));
    let queue = Arc::new(MatchmakingQueue::new(
        mm_config.clone(),
        parties.clone(),
        notifier_dyn.clone(),
        queue_tx,
    ));
    let registry = Arc::new(SessionRegistry::new(
        session_config.clone(),
        notifier_dyn.clone(),
        session_tx,
    ));
    let finalizer = Arc::new(OutcomeFinalizer::new(
        OutcomeConfig::default(),
        store.clone(),
        notifier_dyn,
    ));

    let state = AppState {
        parties,
        queue,
        registry,
        finalizer,
        notifier,
        store,
        mm_config,
        session_config,
    };

    bridge::spawn_bridges(state.clone(), queue_rx, session_rx);

    let app = create_router(state);

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
