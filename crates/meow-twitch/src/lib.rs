//! # meow-twitch
//!
//! Twitch EventSub websocket listener. Chat messages and cheers are decoded
//! and pushed onto the meowtts event bus; everything else is logged and
//! dropped.
//!
//! Authentication is out of scope: a user access token with
//! `user:read:chat`, `bits:read` and `user:write:chat` is supplied through
//! configuration.

#![deny(unsafe_code)]

pub mod backoff;
pub mod errors;
pub mod helix;
pub mod listener;
pub mod messages;

pub use backoff::Backoff;
pub use errors::EventSubError;
pub use helix::HelixClient;
pub use listener::{EventSubListener, ListenerConfig};
pub use messages::{Inbound, Notification, parse_message};
