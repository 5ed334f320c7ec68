use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::ws::connctx::ConnHandle;

/// Process-local routing table from session id to its live connections.
///
/// This is a cache of who is attached here, never the record of session state.
/// Built once at startup and handed to the engine; emptied on shutdown.
pub struct ConnectionRegistry {
    rooms: RwLock<HashMap<String, HashMap<Uuid, ConnHandle>>>,
    max_sessions: usize,
    max_connections_per_session: usize,
}

impl ConnectionRegistry {
    pub fn new(max_sessions: usize, max_connections_per_session: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            max_sessions,
            max_connections_per_session,
        }
    }

    /// Track `conn` under `session_id`. Adding an already tracked connection is a no-op.
    pub async fn add_connection(&self, session_id: &str, conn: ConnHandle) -> Result<(), EngineError> {
        let mut rooms = self.rooms.write().await;

        if !rooms.contains_key(session_id) && rooms.len() >= self.max_sessions {
            return Err(EngineError::MaxSessionsExceeded);
        }

        let conns = rooms.entry(session_id.to_string()).or_default();
        if conns.contains_key(&conn.id) {
            return Ok(());
        }
        if conns.len() >= self.max_connections_per_session {
            let empty = conns.is_empty();
            if empty {
                rooms.remove(session_id);
            }
            return Err(EngineError::MaxConnectionsPerSessionExceeded(session_id.to_string()));
        }

        debug!("Registering connection {} for session {}", conn.id, session_id);
        conns.insert(conn.id, conn);
        Ok(())
    }

    /// Drop `conn_id` from the session and return how many connections remain.
    /// An emptied session stops counting toward the session cap.
    pub async fn remove_connection(&self, session_id: &str, conn_id: Uuid) -> usize {
        let mut rooms = self.rooms.write().await;
        let Some(conns) = rooms.get_mut(session_id) else {
            return 0;
        };
        conns.remove(&conn_id);
        let remaining = conns.len();
        if remaining == 0 {
            rooms.remove(session_id);
        }
        remaining
    }

    /// Snapshot of the session's connections, safe to iterate while others mutate
    pub async fn list_connections(&self, session_id: &str) -> Vec<ConnHandle> {
        let rooms = self.rooms.read().await;
        rooms
            .get(session_id)
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn session_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.rooms.read().await.values().map(|c| c.len()).sum()
    }

    pub async fn clear(&self) {
        self.rooms.write().await.clear();
    }
}
