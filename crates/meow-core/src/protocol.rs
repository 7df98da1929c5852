//! Outbound websocket framing.
//!
//! One broadcast is exactly: a `{"type":"start"}` text frame, zero or more
//! binary frames (one per audio chunk, in production order), then a
//! `{"type":"end"}` text frame. Clients never send application messages.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Serialized start marker.
pub const START_JSON: &str = r#"{"type":"start"}"#;
/// Serialized end marker.
pub const END_JSON: &str = r#"{"type":"end"}"#;

/// Control markers bracketing one utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// An utterance is about to stream.
    Start,
    /// The utterance is complete (or was abandoned).
    End,
}

impl ControlMessage {
    /// JSON text of this marker.
    #[must_use]
    pub const fn as_json(self) -> &'static str {
        match self {
            Self::Start => START_JSON,
            Self::End => END_JSON,
        }
    }
}

/// One discrete unit sent over a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame (control markers).
    Text(Arc<str>),
    /// Opaque binary frame (an audio chunk).
    Binary(Bytes),
}

impl Frame {
    /// A text frame carrying a control marker.
    #[must_use]
    pub fn control(message: ControlMessage) -> Self {
        Self::Text(Arc::from(message.as_json()))
    }

    /// A binary frame carrying one audio chunk.
    #[must_use]
    pub fn audio(chunk: Bytes) -> Self {
        Self::Binary(chunk)
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a text frame back into a control marker.
    #[must_use]
    pub fn as_control(&self) -> Option<ControlMessage> {
        match self {
            Self::Text(text) => serde_json::from_str(text).ok(),
            Self::Binary(_) => None,
        }
    }
}
