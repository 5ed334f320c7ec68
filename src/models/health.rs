use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for the health and readiness checks
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
