use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/apis/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/apis/ready",
    responses(
        (status = 200, description = "Session store is reachable", body = HealthResponse),
        (status = 503, description = "Session store unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Create a session
#[utoipa::path(
    post,
    path = "/apis/session/",
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_session_doc() {}

/// Extend a session by ten minutes
#[utoipa::path(
    post,
    path = "/apis/extend-session/{session_id}/",
    params(
        ("session_id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Session extended", body = ExtendSessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn extend_session_doc() {}

/// Room occupancy and process load
#[utoipa::path(
    get,
    path = "/apis/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        create_session_doc,
        extend_session_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, ErrorResponse, CreateSessionResponse, ExtendSessionResponse, DiagnosticsResponse)
    ),
    tags(
        (name = "api", description = "Session endpoints")
    )
)]
pub struct ApiDoc;
