//! Shared test utilities for the room integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use menu_rooms::models::{decode_session, encode_session, Session};
use menu_rooms::store::{MemoryStore, SessionStore, StoreError, Subscription};
use menu_rooms::{create_app, AppState, Config};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Config with a short reconcile interval so fallback paths show up quickly
pub fn fast_config() -> Config {
    Config {
        reconcile_interval_ms: 200,
        ..Config::default()
    }
}

pub struct TestServer {
    pub state: Arc<AppState>,
    pub addr: SocketAddr,
}

impl TestServer {
    pub async fn start(config: Config) -> Self {
        Self::start_with_store(config, Arc::new(MemoryStore::new())).await
    }

    pub async fn start_with_store(config: Config, store: Arc<dyn SessionStore>) -> Self {
        let state = Arc::new(AppState::new(config, store));
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        // Brief delay to ensure server is accepting connections
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self { state, addr }
    }

    pub async fn create_session(&self) -> String {
        self.state.sessions.create(Utc::now()).await.unwrap().0
    }

    pub async fn stored(&self, session_id: &str) -> Option<Session> {
        self.state
            .sessions
            .store()
            .get(session_id)
            .await
            .unwrap()
            .map(|raw| decode_session(&raw).unwrap())
    }

    /// Overwrite the stored session directly, bypassing the engine
    pub async fn put_session(&self, session_id: &str, session: &Session) {
        self.state
            .sessions
            .store()
            .set_ex(session_id, encode_session(session).unwrap(), 600)
            .await
            .unwrap();
    }

    pub async fn connect(&self, session_id: &str) -> Result<WsClient, tungstenite::Error> {
        WsClient::connect(self.addr, session_id).await
    }

    /// Poll until the engine reports `n` local connections
    pub async fn wait_for_connections(&self, n: usize) {
        for _ in 0..100 {
            if self.state.engine.stats().await.connections == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} connections, have {}", n, self.state.engine.stats().await.connections);
    }
}

pub fn session_with_participants(n: usize, expires_at: DateTime<Utc>) -> Session {
    let mut session = Session::new(expires_at);
    session.participants = (0..n).map(|i| format!("10.0.0.{}:4000", i)).collect();
    session
}

/// WebSocket client joined to one session
pub struct WsClient {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl WsClient {
    pub async fn connect(addr: SocketAddr, session_id: &str) -> Result<Self, tungstenite::Error> {
        let url = format!("ws://{}/ws/{}/", addr, session_id);
        let (ws, _) = tokio_tungstenite::connect_async(&url).await?;
        let (sink, stream) = ws.split();
        Ok(Self { sink, stream })
    }

    pub async fn send(&mut self, text: &str) {
        self.sink.send(Message::Text(text.to_string().into())).await.unwrap();
    }

    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }

    /// Next menu frame, or None on timeout
    pub async fn recv_menu(&mut self, wait: Duration) -> Option<Vec<String>> {
        let next = async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return serde_json::from_str::<Vec<String>>(&text.to_string()).ok();
                    }
                    Some(Ok(Message::Close(_))) | None => return None,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => panic!("WebSocket error: {}", e),
                }
            }
        };
        tokio::time::timeout(wait, next).await.ok().flatten()
    }

    /// Read frames until the expected menu shows up
    pub async fn expect_menu(&mut self, expected: &[&str]) {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        let mut last = None;
        while tokio::time::Instant::now() < deadline {
            let remaining = deadline - tokio::time::Instant::now();
            match self.recv_menu(remaining).await {
                Some(menu) if menu == expected => return,
                Some(menu) => last = Some(menu),
                None => break,
            }
        }
        panic!("expected menu {:?}, last seen {:?}", expected, last);
    }

    /// Wait for a close frame and return its reason
    pub async fn expect_close(&mut self) -> String {
        let next = async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Close(frame))) => {
                        return frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => panic!("WebSocket error: {}", e),
                    None => panic!("stream ended without close frame"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(3), next)
            .await
            .expect("no close frame")
    }
}

/// Memory store whose publishes can be dropped and whose reads can be failed
pub struct FaultyStore {
    inner: MemoryStore,
    pub drop_publishes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            drop_publishes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError> {
        self.inner.set_ex(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<usize, StoreError> {
        if self.drop_publishes.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        self.inner.subscribe(channel).await
    }
}
