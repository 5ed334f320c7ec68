use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json};
use crate::models::{ErrorResponse, HealthResponse};
use crate::state::AppState;
use tracing::{debug, error};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint, verifies the session store answers
pub async fn ready_check(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Readiness check requested");
    if let Err(e) = app_state.sessions.store().get("__ready__").await {
        error!("Session store not ready: {}", e);
        let status = StatusCode::SERVICE_UNAVAILABLE;
        return Err((
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: format!("Session store unavailable: {}", e),
            }),
        ));
    }
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
    }))
}
