//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::token::TokenKeys;
use qa_engine_core::{DatabaseService, QaEngine};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// The database handle is injected here; nothing in the service reaches for a
/// process-wide connection.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub engine: QaEngine,
    pub config: Arc<Config>,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        let tokens = TokenKeys::new(config.token_secret.as_bytes(), config.token_ttl);
        Self {
            engine: QaEngine::new(db.clone()),
            db,
            config,
            tokens,
        }
    }
}
