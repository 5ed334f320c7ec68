use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response returned after creating a session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// Join path for the WebSocket endpoint
    pub url: String,
}

/// Response returned after extending a session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ExtendSessionResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}
