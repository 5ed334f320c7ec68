use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Frame queued for a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// JSON array of menu items
    Menu(String),
    Close { code: u16, reason: String },
}

/// Handle to one live connection. Identity is the connection id, not the client.
#[derive(Clone, Debug)]
pub struct ConnHandle {
    pub id: Uuid,
    pub client: String,
    tx: mpsc::Sender<Outbound>,
}

impl ConnHandle {
    pub fn new(client: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            client: client.into(),
            tx,
        };
        (handle, rx)
    }

    /// Queue a menu frame without waiting. Returns false if the frame was dropped
    /// because the connection is gone or its buffer is full.
    pub fn push_menu(&self, payload: &str) -> bool {
        self.tx.try_send(Outbound::Menu(payload.to_string())).is_ok()
    }

    /// Ask the writer to send a close frame. Gives up after a second if the
    /// buffer stays full.
    pub async fn close(&self, code: u16, reason: &str) {
        let frame = Outbound::Close {
            code,
            reason: reason.to_string(),
        };
        let _ = tokio::time::timeout(Duration::from_secs(1), self.tx.send(frame)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
