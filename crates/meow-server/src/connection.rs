//! A single websocket client, as seen by the broadcaster.

use std::sync::Arc;
use std::time::Duration;

use meow_core::{ConnectionId, Frame};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::errors::SendError;

/// Handle to one accepted websocket.
///
/// Frames go through a bounded channel to the connection's writer task, so
/// [`send`](Self::send) waits when the client falls behind and fails once the
/// writer has exited.
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    tx: mpsc::Sender<Frame>,
    connected_at: Instant,
    last_activity: Mutex<Instant>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wrap the sending half of a writer channel.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Frame>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            last_activity: Mutex::new(now),
        }
    }

    /// A fresh connection plus the receiver its writer drains.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self::new(ConnectionId::new(), tx)), rx)
    }

    /// Queue a frame for the writer, waiting for room if the queue is full.
    pub async fn send(&self, frame: Frame) -> Result<(), SendError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| SendError::Closed(self.id.clone()))
    }

    /// Whether the writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Record inbound traffic (pong or any frame) from the client.
    pub fn mark_alive(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the client last showed activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Time since the connection was accepted.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
