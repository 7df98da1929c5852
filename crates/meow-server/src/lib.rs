//! # meow-server
//!
//! The dispatch and broadcast half of meowtts:
//!
//! - [`Dispatcher`]: sole consumer of the event bus; routes, synthesizes, broadcasts
//! - [`StreamBroadcaster`]: framed `start` / audio / `end` fan-out with per-connection pruning
//! - [`ConnectionRegistry`]: the live set of websocket clients
//! - [`MeowServer`]: Axum router for `/`, `/static/app.js`, `/ws` and `/health`

#![deny(unsafe_code)]

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use broadcast::{BroadcastOutcome, StreamBroadcaster};
pub use config::ServerConfig;
pub use connection::Connection;
pub use dispatcher::{DispatchRules, Dispatcher};
pub use errors::SendError;
pub use registry::ConnectionRegistry;
pub use server::{AppState, MeowServer};
pub use shutdown::ShutdownCoordinator;
