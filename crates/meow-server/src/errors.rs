//! Server error types.

use meow_core::ConnectionId;

/// A frame could not be handed to a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The writer task has exited; the socket is gone.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

impl SendError {
    /// The connection the send was addressed to.
    pub fn connection_id(&self) -> &ConnectionId {
        match self {
            Self::Closed(id) => id,
        }
    }
}
