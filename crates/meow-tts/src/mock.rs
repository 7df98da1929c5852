//! Scripted synthesizer for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use meow_core::VoiceRequest;
use parking_lot::Mutex;

use crate::client::{AudioStream, SynthesisClient};
use crate::errors::SynthesisError;

/// Pre-programmed responses for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Yield these chunks, then end.
    Chunks(Vec<Bytes>),
    /// Fail the `synthesize` call itself.
    Error(SynthesisError),
    /// Yield these chunks, then a terminal stream error.
    FailAfter(Vec<Bytes>, SynthesisError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    /// Chunks from static byte strings.
    pub fn chunks(chunks: &[&'static [u8]]) -> Self {
        Self::Chunks(chunks.iter().map(|c| Bytes::from_static(*c)).collect())
    }

    /// Wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Synthesizer that replays scripted responses in order and records requests.
pub struct MockSynthesizer {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<VoiceRequest>>,
    call_count: AtomicUsize,
}

impl MockSynthesizer {
    /// Create a mock with `responses` consumed one per call.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Number of `synthesize` calls so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<VoiceRequest> {
        self.requests.lock().clone()
    }

    /// Texts of every request received, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.text.clone()).collect()
    }
}

#[async_trait]
impl SynthesisClient for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, request: &VoiceRequest) -> Result<AudioStream, SynthesisError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(request.clone());

        let Some(mut current) = self.responses.lock().pop_front() else {
            return Err(SynthesisError::InvalidRequest(format!(
                "MockSynthesizer: no response configured for call {idx}"
            )));
        };

        loop {
            match current {
                MockResponse::Chunks(chunks) => {
                    return Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))));
                }
                MockResponse::Error(e) => return Err(e),
                MockResponse::FailAfter(chunks, e) => {
                    let items = chunks.into_iter().map(Ok).chain(std::iter::once(Err(e)));
                    return Ok(Box::pin(stream::iter(items)));
                }
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn request(text: &str) -> VoiceRequest {
        VoiceRequest {
            speaker: "tester".into(),
            voice_id: "v".into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn replays_chunks_in_order() {
        let mock = MockSynthesizer::new(vec![MockResponse::chunks(&[b"b1", b"b2"])]);
        let stream = mock.synthesize(&request("hello")).await.unwrap();
        let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"b1"), Bytes::from_static(b"b2")]);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.texts(), vec!["hello"]);
    }

    #[tokio::test]
    async fn error_response() {
        let mock = MockSynthesizer::new(vec![MockResponse::Error(SynthesisError::RateLimited)]);
        assert!(matches!(
            mock.synthesize(&request("x")).await,
            Err(SynthesisError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn fail_after_yields_then_errors() {
        let mock = MockSynthesizer::new(vec![MockResponse::FailAfter(
            vec![Bytes::from_static(b"a")],
            SynthesisError::StreamInterrupted("reset".into()),
        )]);
        let mut stream = mock.synthesize(&request("x")).await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_then_inner() {
        let mock = MockSynthesizer::new(vec![MockResponse::delayed(
            Duration::from_secs(3),
            MockResponse::chunks(&[b"late"]),
        )]);
        let start = tokio::time::Instant::now();
        let _ = mock.synthesize(&request("x")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn exhausted_responses() {
        let mock = MockSynthesizer::new(vec![]);
        assert!(mock.synthesize(&request("x")).await.is_err());
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.requests().len(), 1);
    }
}
