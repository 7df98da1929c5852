//! The synthesis seam.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use meow_core::VoiceRequest;

use crate::errors::SynthesisError;

/// One synthesized utterance as a lazy sequence of encoded audio chunks.
///
/// Forward-only and one-shot: it is consumed by a single broadcast and can
/// be neither restarted nor rewound. An `Err` item is terminal; callers stop
/// polling after it.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, SynthesisError>> + Send>>;

/// A text-to-speech provider.
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Start synthesizing `request`.
    ///
    /// Resolves once the provider has accepted the request; audio then
    /// arrives through the returned stream.
    async fn synthesize(&self, request: &VoiceRequest) -> Result<AudioStream, SynthesisError>;
}
