use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::EngineError;
use crate::models::encode_menu;
use crate::services::session_lifecycle::{add_participant, extend_expiration};
use crate::services::SessionService;
use crate::utils::scope_guard::ScopeGuard;
use crate::websocket::msg_command_handler::handle_command_message;
use crate::websocket::relay::Relay;
use crate::ws::connctx::{ConnHandle, Outbound};
use crate::ws::registry::ConnectionRegistry;

pub const SESSION_EXPIRED: &str = "session expired";

type ReleaseGuard = ScopeGuard<Box<dyn FnOnce() + Send>>;

/// A connection that passed admission but has not been served yet.
/// Dropping it unserved releases its registry slot.
pub struct Admission {
    pub conn: ConnHandle,
    rx: mpsc::Receiver<Outbound>,
    release: ReleaseGuard,
}

/// Why a connection's command loop stopped
#[derive(Debug, PartialEq)]
enum ReadOutcome {
    Disconnected,
    SessionExpired,
}

pub struct EngineStats {
    pub sessions: usize,
    pub connections: usize,
    pub relays: usize,
}

/// Admits connections into session rooms, runs their control loops and keeps
/// one relay per locally attached session.
pub struct SessionEngine {
    sessions: Arc<SessionService>,
    registry: Arc<ConnectionRegistry>,
    relays: Mutex<HashMap<String, JoinHandle<()>>>,
    max_participants: usize,
    outbound_buffer: usize,
    reconcile_interval: Duration,
    delete_when_empty: bool,
    shutting_down: AtomicBool,
}

impl SessionEngine {
    pub fn new(sessions: Arc<SessionService>, registry: Arc<ConnectionRegistry>, config: &Config) -> Self {
        Self {
            sessions,
            registry,
            relays: Mutex::new(HashMap::new()),
            max_participants: config.max_participants,
            outbound_buffer: config.outbound_buffer,
            reconcile_interval: config.reconcile_interval(),
            delete_when_empty: config.delete_when_empty,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Check capacity, register the connection, record the participant and
    /// extend the session. Every failure here rejects the join.
    pub async fn admit(self: &Arc<Self>, session_id: &str, client: &str) -> Result<Admission, EngineError> {
        let session = self.sessions.load(session_id, Utc::now()).await?;
        if session.participants.len() >= self.max_participants {
            return Err(EngineError::RoomFull(session_id.to_string()));
        }

        let (conn, rx) = ConnHandle::new(client, self.outbound_buffer);
        self.attach(session_id, &conn).await?;

        let max_participants = self.max_participants;
        let extend_by = self.sessions.extend_by();
        let participant = conn.client.clone();
        let room = session_id.to_string();
        let updated = self
            .sessions
            .update(session_id, move |s| {
                if s.participants.len() >= max_participants {
                    return Err(EngineError::RoomFull(room));
                }
                add_participant(s, participant);
                extend_expiration(s, extend_by);
                Ok(())
            })
            .await;

        let session = match updated {
            Ok((session, _)) => session,
            Err(e) => {
                self.release(session_id, conn.id, false).await;
                return Err(e);
            }
        };

        info!(
            "Admitted connection {} ({}) into session {} [{} participants]",
            conn.id,
            conn.client,
            session_id,
            session.participants.len()
        );

        if let Ok(payload) = encode_menu(&session.menu) {
            conn.push_menu(&payload);
        }

        let engine = self.clone();
        let sid = session_id.to_string();
        let conn_id = conn.id;
        let release: Box<dyn FnOnce() + Send> = Box::new(move || {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move { engine.release(&sid, conn_id, true).await });
            }
        });

        Ok(Admission {
            conn,
            rx,
            release: ScopeGuard::new(release),
        })
    }

    // Registry membership and relay ownership change together under the relay lock.
    async fn attach(&self, session_id: &str, conn: &ConnHandle) -> Result<(), EngineError> {
        let mut relays = self.relays.lock().await;
        self.registry.add_connection(session_id, conn.clone()).await?;

        let running = relays
            .get(session_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false);
        if running {
            return Ok(());
        }

        let subscription = match self.sessions.store().subscribe(session_id).await {
            Ok(sub) => sub,
            Err(e) => {
                self.registry.remove_connection(session_id, conn.id).await;
                return Err(e.into());
            }
        };
        let relay = Relay::new(
            session_id.to_string(),
            self.sessions.clone(),
            self.registry.clone(),
            self.reconcile_interval,
        );
        debug!("Starting relay for session {}", session_id);
        relays.insert(session_id.to_string(), tokio::spawn(relay.run(subscription)));
        Ok(())
    }

    /// Drop a connection from the registry. When it was the last local one the
    /// relay stops and, if configured, the stored session is deleted. Stored
    /// sessions are never deleted once shutdown has begun.
    pub async fn release(&self, session_id: &str, conn_id: Uuid, delete_if_last: bool) {
        let mut relays = self.relays.lock().await;
        let remaining = self.registry.remove_connection(session_id, conn_id).await;
        debug!(
            "Released connection {} from session {}, {} remaining",
            conn_id, session_id, remaining
        );
        if remaining > 0 {
            return;
        }

        if let Some(relay) = relays.remove(session_id) {
            relay.abort();
        }

        if delete_if_last && self.delete_when_empty && !self.shutting_down.load(Ordering::SeqCst) {
            match self.sessions.delete(session_id).await {
                Ok(true) => info!("Last connection left, deleted session {}", session_id),
                Ok(false) => debug!("Session {} was already gone", session_id),
                Err(e) => warn!("Failed to delete session {}: {}", session_id, e),
            }
        }
    }

    /// Serve an admitted connection until it closes. Failures stay inside this
    /// connection; a panicking task is turned into an error close frame.
    pub async fn run_connection(self: Arc<Self>, socket: WebSocket, session_id: String, admission: Admission) {
        let Admission { conn, rx, release } = admission;
        let (sender, receiver) = socket.split();

        let mut writer = tokio::spawn(write_loop(sender, rx));
        let mut reader = tokio::spawn(read_loop(
            receiver,
            self.sessions.clone(),
            session_id.clone(),
            conn.id,
        ));

        tokio::select! {
            res = &mut writer => {
                reader.abort();
                if let Err(e) = res {
                    error!("Writer for connection {} failed: {}", conn.id, e);
                }
            }
            res = &mut reader => {
                match res {
                    Ok(ReadOutcome::Disconnected) => writer.abort(),
                    Ok(ReadOutcome::SessionExpired) => {
                        conn.close(close_code::NORMAL, SESSION_EXPIRED).await;
                        finish_writer(writer).await;
                    }
                    Err(e) => {
                        error!("Command loop for connection {} failed: {}", conn.id, e);
                        conn.close(close_code::ERROR, "internal error").await;
                        finish_writer(writer).await;
                    }
                }
            }
        }

        info!("Connection {} left session {}", conn.id, session_id);
        drop(release);
    }

    pub async fn stats(&self) -> EngineStats {
        let relays = self.relays.lock().await.len();
        EngineStats {
            sessions: self.registry.session_count().await,
            connections: self.registry.connection_count().await,
            relays,
        }
    }

    /// Stop every relay, ask local connections to go away and empty the
    /// registry. Stored sessions stay in the store for the next process.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let mut relays = self.relays.lock().await;
        for (session_id, relay) in relays.drain() {
            relay.abort();
            for conn in self.registry.list_connections(&session_id).await {
                conn.close(close_code::AWAY, "server shutting down").await;
            }
        }
        self.registry.clear().await;
        info!("Session engine stopped");
    }
}

async fn finish_writer(mut writer: JoinHandle<()>) {
    if tokio::time::timeout(Duration::from_secs(1), &mut writer).await.is_err() {
        writer.abort();
    }
}

async fn write_loop(mut sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(out) = rx.recv().await {
        let msg = match out {
            Outbound::Menu(payload) => Message::Text(payload),
            Outbound::Close { code, reason } => {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                let _ = sender.send(Message::Close(Some(frame))).await;
                break;
            }
        };
        if sender.send(msg).await.is_err() {
            break;
        }
    }
}

async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    sessions: Arc<SessionService>,
    session_id: String,
    conn_id: Uuid,
) -> ReadOutcome {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match handle_command_message(&text, &session_id, &sessions).await {
                    Ok(menu) => debug!("Session {} menu now has {} items", session_id, menu.len()),
                    Err(EngineError::InvalidCommand(reason)) => {
                        warn!("Ignoring command from {} in session {}: {}", conn_id, session_id, reason);
                    }
                    Err(EngineError::SessionNotFound(_)) => {
                        info!("Session {} expired under connection {}", session_id, conn_id);
                        return ReadOutcome::SessionExpired;
                    }
                    Err(e) => {
                        error!("Failed to apply command in session {}: {}", session_id, e);
                    }
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Connection {} sent close frame", conn_id);
                break;
            }
            Ok(_) => {
                // Binary, ping and pong frames carry no commands
            }
            Err(e) => {
                warn!("WebSocket error on connection {}: {}", conn_id, e);
                break;
            }
        }
    }
    ReadOutcome::Disconnected
}
