//! Events delivered by the chat-platform listener.
//!
//! An [`Event`] is immutable once enqueued, consumed exactly once by the
//! dispatcher, and then discarded.

use serde::{Deserialize, Serialize};

/// Wire name of a chat message event.
pub const CHAT_MESSAGE: &str = "channel.message";
/// Wire name of a cheer (paid bits) event.
pub const CHEER: &str = "channel.cheer";

/// A discrete notification from the chat platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A chat line posted in the channel.
    #[serde(rename = "channel.message")]
    ChatMessage {
        /// Login of the chatter.
        speaker: String,
        /// Raw message text.
        text: String,
    },
    /// Bits cheered in the channel, with the accompanying message.
    #[serde(rename = "channel.cheer")]
    Cheer {
        /// Login of the cheering user (`anonymous` for anonymous cheers).
        speaker: String,
        /// Number of bits cheered.
        bits: u32,
        /// Raw message text, including cheermote tokens such as `Cheer100`.
        text: String,
    },
}

impl Event {
    /// Convenience constructor for a chat message.
    pub fn chat(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ChatMessage {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// Convenience constructor for a cheer.
    pub fn cheer(speaker: impl Into<String>, bits: u32, text: impl Into<String>) -> Self {
        Self::Cheer {
            speaker: speaker.into(),
            bits,
            text: text.into(),
        }
    }

    /// Wire name of this event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => CHAT_MESSAGE,
            Self::Cheer { .. } => CHEER,
        }
    }

    /// Who triggered the event.
    #[must_use]
    pub fn speaker(&self) -> &str {
        match self {
            Self::ChatMessage { speaker, .. } | Self::Cheer { speaker, .. } => speaker,
        }
    }

    /// Raw message text carried by the event.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::ChatMessage { text, .. } | Self::Cheer { text, .. } => text,
        }
    }
}
