use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::close_code;
use chrono::Utc;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::models::{decode_menu, encode_menu};
use crate::services::SessionService;
use crate::store::Subscription;
use crate::websocket::engine::SESSION_EXPIRED;
use crate::ws::registry::ConnectionRegistry;

/// Forwards a session's channel to every connection this process holds for it.
///
/// When nothing arrives within the reconcile interval the relay reads the store
/// directly and pushes that menu instead, so a lost publish is repaired within
/// one interval.
pub struct Relay {
    session_id: String,
    sessions: Arc<SessionService>,
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
}

enum Event {
    Update(String),
    ChannelClosed,
    Idle,
}

enum Reconciled {
    Pushed,
    Retry,
    Gone,
}

impl Relay {
    pub fn new(
        session_id: String,
        sessions: Arc<SessionService>,
        registry: Arc<ConnectionRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            session_id,
            sessions,
            registry,
            interval,
        }
    }

    pub async fn run(self, subscription: Subscription) {
        let mut subscription = Some(subscription);
        loop {
            let event = match subscription {
                Some(ref mut sub) => match tokio::time::timeout(self.interval, sub.next()).await {
                    Ok(Some(payload)) => Event::Update(payload),
                    Ok(None) => Event::ChannelClosed,
                    Err(_) => Event::Idle,
                },
                None => {
                    tokio::time::sleep(self.interval).await;
                    subscription = self.resubscribe().await;
                    Event::Idle
                }
            };

            match event {
                Event::Update(payload) => self.relay_payload(&payload).await,
                Event::ChannelClosed => {
                    warn!("Channel for session {} closed, resubscribing", self.session_id);
                    subscription = self.resubscribe().await;
                }
                Event::Idle => {
                    if let Reconciled::Gone = self.reconcile().await {
                        break;
                    }
                }
            }
        }
        debug!("Relay for session {} stopped", self.session_id);
    }

    async fn resubscribe(&self) -> Option<Subscription> {
        match self.sessions.store().subscribe(&self.session_id).await {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!("Resubscribe to session {} failed: {}", self.session_id, e);
                None
            }
        }
    }

    async fn relay_payload(&self, payload: &str) {
        // Re-encode so clients only ever see a well-formed menu array
        let menu = match decode_menu(payload) {
            Ok(menu) => menu,
            Err(e) => {
                warn!("Dropping malformed update on session {}: {}", self.session_id, e);
                return;
            }
        };
        self.fan_out(&menu).await;
    }

    async fn reconcile(&self) -> Reconciled {
        match self.sessions.load(&self.session_id, Utc::now()).await {
            Ok(session) => {
                self.fan_out(&session.menu).await;
                Reconciled::Pushed
            }
            Err(EngineError::SessionNotFound(_)) => {
                info!("Session {} expired, closing local connections", self.session_id);
                for conn in self.registry.list_connections(&self.session_id).await {
                    conn.close(close_code::NORMAL, SESSION_EXPIRED).await;
                }
                Reconciled::Gone
            }
            Err(e) => {
                debug!("Reconciliation read for session {} failed: {}", self.session_id, e);
                Reconciled::Retry
            }
        }
    }

    /// Push a menu to every open local connection, returning how many took it
    async fn fan_out(&self, menu: &[String]) -> usize {
        let payload = match encode_menu(menu) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode menu for session {}: {}", self.session_id, e);
                return 0;
            }
        };
        let mut delivered = 0;
        for conn in self.registry.list_connections(&self.session_id).await {
            if conn.is_closed() {
                debug!("Skipping closed connection {} in session {}", conn.id, self.session_id);
                continue;
            }
            if conn.push_menu(&payload) {
                delivered += 1;
            } else {
                debug!("Dropped update for connection {} in session {}", conn.id, self.session_id);
            }
        }
        delivered
    }
}
