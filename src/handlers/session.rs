use crate::{
    models::{CreateSessionResponse, ErrorResponse, ExtendSessionResponse},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// Create a session and hand back its join path
pub async fn create_session(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let (session_id, _) = app_state.sessions.create(Utc::now()).await.map_err(|e| {
        error!("Failed to create session: {}", e);
        e.to_response()
    })?;

    let url = format!("/ws/{}/", session_id);
    info!("Session {} ready at {}", session_id, url);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id, url }),
    ))
}

/// Push a session's expiry out by the configured extension
pub async fn extend_session(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<ExtendSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let session = app_state.sessions.extend(&session_id).await.map_err(|e| {
        error!("Failed to extend session '{}': {}", session_id, e);
        e.to_response()
    })?;

    Ok((
        StatusCode::OK,
        Json(ExtendSessionResponse {
            success: true,
            expires_at: session.expires_at,
        }),
    ))
}
