//! Shared application state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::services::SessionService;
use crate::store::SessionStore;
use crate::websocket::SessionEngine;
use crate::ws::registry::ConnectionRegistry;

/// Built once at startup and shared by every handler
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionService>,
    pub engine: Arc<SessionEngine>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn SessionStore>) -> Self {
        let sessions = Arc::new(SessionService::new(store, &config));
        let registry = Arc::new(ConnectionRegistry::new(
            config.max_sessions,
            config.max_connections_per_session,
        ));
        let engine = Arc::new(SessionEngine::new(sessions.clone(), registry, &config));
        Self {
            config,
            sessions,
            engine,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
