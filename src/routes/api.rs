use crate::{handlers, state::AppState};
use axum::{routing::{get, post}, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::<Arc<AppState>>::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        .route("/diagnostics", get(handlers::diagnostics))
        .route("/session/", post(handlers::create_session))
        .route("/extend-session/:session_id/", post(handlers::extend_session))
}
