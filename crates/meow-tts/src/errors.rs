//! Synthesis error classification.

/// Errors from a speech synthesis provider.
///
/// Every variant is terminal for the request that produced it. Nothing in
/// the pipeline retries.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// Credentials missing or rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    /// The provider rejected the request (unknown voice, bad format, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Quota or concurrency limit hit.
    #[error("rate limited")]
    RateLimited,
    /// Provider-side failure.
    #[error("server error {status}: {body}")]
    ServerError {
        /// HTTP status.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The request never reached the provider or no response came back.
    #[error("network error: {0}")]
    NetworkError(String),
    /// The audio stream broke after it started.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    /// Nothing to say after cleaning.
    #[error("empty text")]
    EmptyText,
}

impl SynthesisError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RateLimited => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::StreamInterrupted(_) => "stream_interrupted",
            Self::EmptyText => "empty_text",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 | 404 | 422 => Self::InvalidRequest(body),
            429 => Self::RateLimited,
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}
