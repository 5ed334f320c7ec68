use chrono::{DateTime, Utc};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::EngineError;
use crate::models::{decode_session, encode_menu, encode_session, Session};
use crate::services::session_lifecycle::{extend_expiration, remaining_ttl_secs};
use crate::store::SessionStore;

/// All reads and writes of session state go through here. Read-modify-write
/// cycles for one session id are serialized by a per-session lock.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    locks: Cache<String, Arc<Mutex<()>>>,
    session_ttl: chrono::Duration,
    extend_by: chrono::Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, config: &Config) -> Self {
        Self {
            store,
            locks: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(30 * 60))
                .build(),
            session_ttl: config.session_ttl(),
            extend_by: config.extend_by(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn extend_by(&self) -> chrono::Duration {
        self.extend_by
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .get_with(session_id.to_string(), || Arc::new(Mutex::new(())))
    }

    /// Create an empty session living for the configured TTL
    pub async fn create(&self, now: DateTime<Utc>) -> Result<(String, Session), EngineError> {
        let session_id = Uuid::new_v4().to_string();
        let session = Session::new(now + self.session_ttl);
        self.write(&session_id, &session, now).await?;
        info!("Created session {} expiring at {}", session_id, session.expires_at);
        Ok((session_id, session))
    }

    /// Current state, or `SessionNotFound` when absent or past its expiry
    pub async fn load(&self, session_id: &str, now: DateTime<Utc>) -> Result<Session, EngineError> {
        let raw = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let session = decode_session(&raw)
            .map_err(|e| EngineError::Internal(format!("corrupt session {}: {}", session_id, e)))?;
        if session.is_expired(now) {
            debug!("Session {} is past its expiry", session_id);
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }
        Ok(session)
    }

    /// Load, apply `f`, and write back with the TTL re-armed from `expires_at`.
    /// Nothing is written if `f` fails.
    pub async fn update<T, F>(&self, session_id: &str, f: F) -> Result<(Session, T), EngineError>
    where
        F: FnOnce(&mut Session) -> Result<T, EngineError>,
    {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;
        self.update_locked(session_id, f).await
    }

    /// Like [`SessionService::update`], then publish the new menu on the session
    /// channel before releasing the lock so publish order follows write order.
    pub async fn update_and_publish<T, F>(&self, session_id: &str, f: F) -> Result<(Session, T), EngineError>
    where
        F: FnOnce(&mut Session) -> Result<T, EngineError>,
    {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;
        let (session, out) = self.update_locked(session_id, f).await?;
        let payload = encode_menu(&session.menu)
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        let receivers = self.store.publish(session_id, payload).await?;
        debug!("Published menu for {} to {} subscribers", session_id, receivers);
        Ok((session, out))
    }

    async fn update_locked<T, F>(&self, session_id: &str, f: F) -> Result<(Session, T), EngineError>
    where
        F: FnOnce(&mut Session) -> Result<T, EngineError>,
    {
        let now = Utc::now();
        let mut session = self.load(session_id, now).await?;
        let out = f(&mut session)?;
        self.write(session_id, &session, now).await?;
        Ok((session, out))
    }

    /// Add the configured extension to `expires_at`
    pub async fn extend(&self, session_id: &str) -> Result<Session, EngineError> {
        let delta = self.extend_by;
        let (session, _) = self
            .update(session_id, |s| {
                extend_expiration(s, delta);
                Ok(())
            })
            .await?;
        info!("Extended session {} until {}", session_id, session.expires_at);
        Ok(session)
    }

    pub async fn delete(&self, session_id: &str) -> Result<bool, EngineError> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;
        let removed = self.store.delete(session_id).await?;
        self.locks.invalidate(session_id);
        Ok(removed)
    }

    async fn write(&self, session_id: &str, session: &Session, now: DateTime<Utc>) -> Result<(), EngineError> {
        let value = encode_session(session).map_err(|e| EngineError::Internal(e.to_string()))?;
        let ttl = remaining_ttl_secs(session, now);
        self.store.set_ex(session_id, value, ttl).await?;
        Ok(())
    }
}
