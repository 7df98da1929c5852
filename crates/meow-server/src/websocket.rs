//! Per-connection websocket lifecycle.
//!
//! Each socket is split into a writer task, which drains the connection's
//! frame queue and sends heartbeat pings, and a reader task, which records
//! client activity and discards whatever the client sends. When either side
//! finishes the connection is unregistered. A write that stays blocked for the
//! heartbeat timeout counts as a dead client, so a peer that stops reading
//! cannot hold a broadcast open.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use meow_core::Frame;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::connection::Connection;
use crate::registry::ConnectionRegistry;

/// Heartbeat timing for one connection.
#[derive(Clone, Copy, Debug)]
pub struct Heartbeat {
    /// Interval between pings.
    pub interval: Duration,
    /// Close after this long without client activity.
    pub timeout: Duration,
}

/// Why a connection's writer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The frame queue closed.
    QueueClosed,
    /// A socket write failed.
    SocketError,
    /// No client activity, or a write blocked, for the heartbeat timeout.
    TimedOut,
    /// Server shutdown.
    Cancelled,
}

/// Serve one upgraded socket until it closes.
pub async fn handle_socket(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    send_queue: usize,
    heartbeat: Heartbeat,
    cancel: CancellationToken,
) {
    let (connection, frames) = Connection::channel(send_queue);
    let id = connection.id.clone();
    let _ = registry.add(Arc::clone(&connection)).await;
    info!(conn_id = %id, "websocket client connected");

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(
        sink,
        frames,
        Arc::clone(&connection),
        heartbeat,
        cancel,
    ));
    let mut reader = tokio::spawn(read_loop(stream, Arc::clone(&connection)));

    let exit = tokio::select! {
        result = &mut writer => {
            reader.abort();
            result.unwrap_or(WriterExit::SocketError)
        }
        _ = &mut reader => {
            writer.abort();
            WriterExit::SocketError
        }
    };

    let _ = registry.remove(&id).await;
    info!(
        conn_id = %id,
        reason = ?exit,
        secs = connection.age().as_secs(),
        "websocket client disconnected"
    );
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Frame>,
    connection: Arc<Connection>,
    heartbeat: Heartbeat,
    cancel: CancellationToken,
) -> WriterExit {
    let mut ping = tokio::time::interval(heartbeat.interval);
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    return WriterExit::QueueClosed;
                };
                let sent = send_within(&mut sink, to_message(frame), heartbeat.timeout).await;
                if let Err(exit) = sent {
                    debug!(conn_id = %connection.id, reason = ?exit, "frame write failed");
                    return exit;
                }
            }
            _ = ping.tick() => {
                if connection.idle_for() >= heartbeat.timeout {
                    debug!(conn_id = %connection.id, "heartbeat timeout");
                    let _ = send_within(&mut sink, Message::Close(None), heartbeat.timeout).await;
                    return WriterExit::TimedOut;
                }
                let ping_msg = Message::Ping(Vec::new().into());
                if let Err(exit) = send_within(&mut sink, ping_msg, heartbeat.timeout).await {
                    return exit;
                }
                trace!(conn_id = %connection.id, "sent ping");
            }
            () = cancel.cancelled() => {
                let _ = send_within(&mut sink, Message::Close(None), heartbeat.timeout).await;
                return WriterExit::Cancelled;
            }
        }
    }
}

/// Write one message, giving up once the client has not drained the socket
/// for `limit`.
async fn send_within(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: Message,
    limit: Duration,
) -> Result<(), WriterExit> {
    match tokio::time::timeout(limit, sink.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(WriterExit::SocketError),
        Err(_) => Err(WriterExit::TimedOut),
    }
}

async fn read_loop(mut stream: SplitStream<WebSocket>, connection: Arc<Connection>) {
    while let Some(Ok(msg)) = stream.next().await {
        connection.mark_alive();
        match msg {
            Message::Close(_) => break,
            Message::Text(text) => {
                trace!(conn_id = %connection.id, len = text.as_str().len(), "ignoring client text");
            }
            _ => {}
        }
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.to_string().into()),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use meow_core::ControlMessage;

    use super::*;

    #[test]
    fn control_frames_become_text() {
        let Message::Text(text) = to_message(Frame::control(ControlMessage::Start)) else {
            panic!("expected text");
        };
        assert_eq!(text.as_str(), r#"{"type":"start"}"#);
    }

    #[test]
    fn audio_frames_become_binary() {
        let msg = to_message(Frame::audio(Bytes::from_static(b"\x00\x01")));
        assert_eq!(msg, Message::Binary(Bytes::from_static(b"\x00\x01")));
    }
}
