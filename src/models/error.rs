use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body for failed requests and rejected joins
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    /// Reason, e.g. `room is full: <session id>`
    pub error: String,
}
