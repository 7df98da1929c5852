//! Framed audio fan-out.
//!
//! One broadcast sends `start`, every audio chunk as a binary frame, then
//! `end`, to each connection in the snapshot it was given. Each frame step
//! sends to all still-live connections concurrently and waits for all of
//! them. A connection whose send fails is removed from the registry and skips
//! the rest of the broadcast; the others carry on.

use std::sync::Arc;

use futures::StreamExt;
use futures::future::join_all;
use meow_core::{ConnectionId, ControlMessage, Frame};
use meow_tts::{AudioStream, SynthesisError};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::registry::ConnectionRegistry;

/// What happened during one broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Whether the broadcast is still running. Always `false` once
    /// [`StreamBroadcaster::broadcast`] returns, since playback is never
    /// handed off to a queue.
    pub active: bool,
    /// Connections in the snapshot at broadcast start.
    pub recipients: usize,
    /// Audio chunks read from the stream.
    pub chunks: usize,
    /// Connections pruned after a failed send.
    pub pruned: usize,
    /// The error that ended the audio stream early, if any.
    pub stream_error: Option<SynthesisError>,
}

impl BroadcastOutcome {
    /// Connections that received the whole broadcast.
    pub fn delivered(&self) -> usize {
        self.recipients.saturating_sub(self.pruned)
    }
}

/// Streams synthesized audio to the connection set.
pub struct StreamBroadcaster {
    registry: Arc<ConnectionRegistry>,
    on_air: Mutex<()>,
}

impl StreamBroadcaster {
    /// Create a broadcaster that prunes failed connections from `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            on_air: Mutex::new(()),
        }
    }

    /// Whether a broadcast is currently in progress.
    pub fn is_on_air(&self) -> bool {
        self.on_air.try_lock().is_err()
    }

    /// Send `audio` to `connections`, framed by `start` and `end`.
    ///
    /// Only one broadcast runs at a time; a second caller waits until the
    /// first has sent its `end` frame. A stream error stops reading audio but
    /// `end` is still sent. Never fails.
    pub async fn broadcast(
        &self,
        connections: Vec<Arc<Connection>>,
        mut audio: AudioStream,
    ) -> BroadcastOutcome {
        let _on_air = self.on_air.lock().await;
        let mut live = connections;
        let mut outcome = BroadcastOutcome {
            recipients: live.len(),
            ..BroadcastOutcome::default()
        };
        info!(recipients = outcome.recipients, "broadcast started");

        outcome.pruned += self
            .send_frame(&mut live, &Frame::control(ControlMessage::Start))
            .await;

        while let Some(item) = audio.next().await {
            match item {
                Ok(chunk) => {
                    outcome.chunks += 1;
                    outcome.pruned += self.send_frame(&mut live, &Frame::audio(chunk)).await;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        kind = e.error_kind(),
                        chunks = outcome.chunks,
                        "audio stream failed mid-broadcast"
                    );
                    outcome.stream_error = Some(e);
                    break;
                }
            }
        }

        outcome.pruned += self
            .send_frame(&mut live, &Frame::control(ControlMessage::End))
            .await;

        info!(
            recipients = outcome.recipients,
            delivered = outcome.delivered(),
            chunks = outcome.chunks,
            pruned = outcome.pruned,
            "broadcast finished"
        );
        outcome
    }

    /// Send one frame to every live connection; prune the ones that fail.
    /// Returns the number pruned.
    async fn send_frame(&self, live: &mut Vec<Arc<Connection>>, frame: &Frame) -> usize {
        if live.is_empty() {
            return 0;
        }

        let results = join_all(live.iter().map(|conn| conn.send(frame.clone()))).await;
        let failed: Vec<ConnectionId> = results
            .into_iter()
            .filter_map(Result::err)
            .map(|e| {
                warn!(conn_id = %e.connection_id(), error = %e, "send failed, pruning connection");
                e.connection_id().clone()
            })
            .collect();
        if failed.is_empty() {
            return 0;
        }

        live.retain(|conn| !failed.contains(&conn.id));
        for id in &failed {
            if !self.registry.remove(id).await {
                debug!(conn_id = %id, "pruned connection already unregistered");
            }
        }
        failed.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
