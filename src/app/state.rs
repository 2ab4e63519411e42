//! Application state shared across routes

use std::sync::Arc;

use crate::commentary::CommentaryService;
use crate::config::Config;
use crate::game::MatchRegistry;
use crate::matchmaking::MatchmakingService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub commentary: Arc<CommentaryService>,
    pub matchmaking: Arc<MatchmakingService>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let commentary = Arc::new(CommentaryService::new(&config));
        let match_registry = Arc::new(MatchRegistry::new());

        // Arc so the service is shared across cloned AppState
        let matchmaking = Arc::new(MatchmakingService::new(
            match_registry.clone(),
            commentary.clone(),
        ));

        Self {
            config,
            commentary,
            matchmaking,
            match_registry,
        }
    }
}
