use crate::notifier::WsNotifier;
use matchmaking::{MatchmakingConfig, MatchmakingQueue, PartyManager};
use race_outcome::OutcomeFinalizer;
use session_registry::{SessionConfig, SessionRegistry};
use std::sync::Arc;
use types::ports::RatingStore;

#[derive(Clone)]
pub struct AppState {
    pub parties: Arc<PartyManager>,
    pub queue: Arc<MatchmakingQueue>,
    pub registry: Arc<SessionRegistry>,
    pub finalizer: Arc<OutcomeFinalizer>,
    pub notifier: Arc<WsNotifier>,
    pub store: Arc<dyn RatingStore>,
    pub mm_config: MatchmakingConfig,
    pub session_config: SessionConfig,
}
