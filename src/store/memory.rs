use async_trait::async_trait;
use futures_util::StreamExt;
use moka::future::Cache;
use moka::Expiry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{SessionStore, StoreError, Subscription};

const CHANNEL_CAPACITY: usize = 256;

type ChannelTable = Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>;

#[derive(Clone, Debug)]
struct StoredValue {
    value: String,
    ttl: Duration,
}

/// Re-arms the entry lifetime on every write, like `SET key value EX ttl`
struct TtlExpiry;

impl Expiry<String, StoredValue> for TtlExpiry {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process store: values in a moka cache with per-entry TTL, channels as tokio broadcasts
pub struct MemoryStore {
    values: Cache<String, StoredValue>,
    channels: ChannelTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: Cache::builder()
                .max_capacity(1_000_000)
                .expire_after(TtlExpiry)
                .build(),
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn channels(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<String>>>, StoreError> {
        self.channels
            .lock()
            .map_err(|_| StoreError::Unavailable("channel table poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).await.map(|v| v.value))
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError> {
        if ttl_secs == 0 {
            debug!("Zero TTL for key {}, removing", key);
            self.values.invalidate(key).await;
            return Ok(());
        }
        let stored = StoredValue {
            value,
            ttl: Duration::from_secs(ttl_secs),
        };
        self.values.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.values.remove(key).await.is_some())
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<usize, StoreError> {
        let mut channels = self.channels()?;
        let Some(tx) = channels.get(channel) else {
            return Ok(0);
        };
        match tx.send(payload) {
            Ok(n) => Ok(n),
            Err(_) => {
                // Every subscriber is gone
                channels.remove(channel);
                Ok(0)
            }
        }
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let rx = {
            let mut channels = self.channels()?;
            channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };
        let receiver = ChannelReceiver {
            rx: Some(rx),
            channel: channel.to_string(),
            channels: self.channels.clone(),
        };
        let stream = futures_util::stream::unfold(receiver, |mut receiver| async move {
            let payload = receiver.recv().await?;
            Some((payload, receiver))
        });
        Ok(stream.boxed())
    }
}

/// Receiving end of one subscription. The last one to go removes its
/// channel from the table.
struct ChannelReceiver {
    rx: Option<broadcast::Receiver<String>>,
    channel: String,
    channels: ChannelTable,
}

impl ChannelReceiver {
    async fn recv(&mut self) -> Option<String> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscriber on {} lagged by {} messages", self.channel, n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ChannelReceiver {
    fn drop(&mut self) {
        drop(self.rx.take());
        let Ok(mut channels) = self.channels.lock() else {
            return;
        };
        let unused = channels
            .get(&self.channel)
            .map(|tx| tx.receiver_count() == 0)
            .unwrap_or(false);
        if unused {
            channels.remove(&self.channel);
            debug!("Last subscriber left {}, channel removed", self.channel);
        }
    }
}
