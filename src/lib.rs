//! Real-time menu rooms: short-lived group sessions whose shared menu is kept
//! in an expiring store and fanned out to every participant over WebSockets.

pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod websocket;
pub mod ws;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::Config;
pub use error::EngineError;
pub use state::AppState;

/// Assemble the full router: REST endpoints under `/apis`, rooms under `/ws`
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = app_state
        .config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let mut app = Router::new()
        .nest("/apis", routes::create_api_routes())
        .route("/ws/:session_id/", get(websocket::handler::websocket_handler))
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    if !origins.is_empty() {
        app = app.layer(CorsLayer::new().allow_origin(origins));
    }
    app
}
