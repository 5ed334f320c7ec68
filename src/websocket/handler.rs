use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{ConnectInfo, Path, State, ws::WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::state::AppState;

/// Join a session room. Admission runs before the upgrade completes, so a
/// rejected join gets a plain HTTP error instead of a socket.
pub async fn websocket_handler(
    Path(session_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(app_state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    info!("New WebSocket connection attempt for session {} from {}", session_id, addr);

    let engine = app_state.engine.clone();
    match engine.admit(&session_id, &addr.to_string()).await {
        Ok(admission) => {
            ws.on_upgrade(move |socket| engine.run_connection(socket, session_id, admission))
        }
        Err(e) => {
            warn!("Rejected join for session {} from {}: {}", session_id, addr, e);
            e.to_response().into_response()
        }
    }
}
