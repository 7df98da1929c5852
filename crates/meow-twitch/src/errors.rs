//! EventSub listener errors.

use thiserror::Error;

/// Errors from the EventSub websocket or the Helix API.
#[derive(Debug, Error)]
pub enum EventSubError {
    /// Could not open the websocket.
    #[error("eventsub connect failed: {0}")]
    Connect(String),
    /// The websocket broke or sent something unusable.
    #[error("eventsub protocol error: {0}")]
    Protocol(String),
    /// No message (including keepalives) within the keepalive window.
    #[error("eventsub keepalive timed out after {0}s")]
    KeepaliveTimeout(u64),
    /// The server closed the session.
    #[error("eventsub session closed")]
    Closed,
    /// Helix rejected a subscription request.
    #[error("subscribe to {subscription} failed with {status}: {body}")]
    Subscribe {
        /// Subscription type.
        subscription: String,
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Helix request failed at the transport level or returned an error.
    #[error("helix request failed: {0}")]
    Http(String),
    /// Required credentials are not configured.
    #[error("missing twitch settings: {0}")]
    MissingCredentials(String),
}

impl EventSubError {
    /// Whether retrying with a fresh connection can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingCredentials(_))
            && !matches!(self, Self::Subscribe { status: 401 | 403, .. })
    }
}
