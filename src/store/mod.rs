//! Expiring key-value store with publish/subscribe, the source of truth for session state.

pub mod memory;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use memory::MemoryStore;

/// Stream of payloads published on one channel
pub type Subscription = BoxStream<'static, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` with a time-to-live. A zero TTL removes the key instead.
    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns the number of subscribers the payload reached
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, StoreError>;

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;
}
