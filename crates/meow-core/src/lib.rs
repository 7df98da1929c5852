//! # meow-core
//!
//! Foundation types shared by every meowtts crate:
//!
//! - **Events**: [`Event`] tagged union produced by the chat-platform listener
//! - **Event bus**: the single ordered producer → dispatcher channel ([`bus`])
//! - **Voice tags**: `[name]` prefix parsing into a [`VoiceRequest`] ([`voice`])
//! - **Wire protocol**: control/binary [`Frame`]s sent to browser clients
//! - **Playback state**: the observable `idle → synthesizing → broadcasting` cycle
//! - **Branded IDs**: [`ConnectionId`]

#![deny(unsafe_code)]

pub mod bus;
pub mod events;
pub mod ids;
pub mod playback;
pub mod protocol;
pub mod voice;

pub use bus::{EventReceiver, EventSender, QueueDepth, event_bus};
pub use events::Event;
pub use ids::ConnectionId;
pub use playback::PlaybackState;
pub use protocol::{ControlMessage, Frame};
pub use voice::{VoiceCatalog, VoiceRequest};
