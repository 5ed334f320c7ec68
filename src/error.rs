//! Error types shared by the engine and the HTTP handlers

use axum::{http::StatusCode, Json};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

/// Errors raised while admitting a connection or mutating a session
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store has no entry for the session, or it has expired
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The stored participant list is at capacity
    #[error("room is full: {0}")]
    RoomFull(String),

    /// This process already tracks the maximum number of sessions
    #[error("maximum number of sessions reached")]
    MaxSessionsExceeded,

    /// This process already holds the maximum connections for the session
    #[error("maximum connections per session reached: {0}")]
    MaxConnectionsPerSessionExceeded(String),

    /// Malformed command, unknown verb or removal of an absent item
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Transient failure talking to the store
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::RoomFull(_)
            | EngineError::MaxSessionsExceeded
            | EngineError::MaxConnectionsPerSessionExceeded(_) => StatusCode::FORBIDDEN,
            EngineError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            EngineError::StoreUnavailable(_) | EngineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render as the JSON error body used by every endpoint
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.status_code();
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: self.to_string(),
            }),
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
            StoreError::Codec(e) => EngineError::Internal(format!("corrupt session value: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_errors_map_to_distinct_statuses() {
        assert_eq!(
            EngineError::SessionNotFound("s".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(EngineError::RoomFull("s".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(EngineError::MaxSessionsExceeded.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            EngineError::StoreUnavailable("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_carries_reason() {
        let (status, Json(body)) = EngineError::RoomFull("abc".into()).to_response();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, 403);
        assert_eq!(body.error, "room is full: abc");
    }

    #[test]
    fn store_errors_convert() {
        let err: EngineError = StoreError::Unavailable("timeout".into()).into();
        assert!(matches!(err, EngineError::StoreUnavailable(m) if m == "timeout"));
    }
}
