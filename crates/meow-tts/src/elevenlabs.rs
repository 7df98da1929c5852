//! ElevenLabs streaming text-to-speech.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use meow_core::VoiceRequest;
use meow_settings::TtsSettings;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::client::{AudioStream, SynthesisClient};
use crate::errors::SynthesisError;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for [`ElevenLabsClient`].
#[derive(Clone, Debug)]
pub struct ElevenLabsConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// API key sent as `xi-api-key`.
    pub api_key: SecretString,
    /// Model used for every request.
    pub model_id: String,
    /// Requested audio encoding.
    pub output_format: String,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

impl ElevenLabsConfig {
    /// Build from settings. Fails if no API key is configured.
    pub fn from_settings(settings: &TtsSettings) -> Result<Self, SynthesisError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            SynthesisError::AuthenticationFailed("ELEVENLABS_API_KEY is not set".into())
        })?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model_id: settings.model_id.clone(),
            output_format: settings.output_format.clone(),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
        })
    }
}

#[derive(Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Streams audio from `POST /v1/text-to-speech/{voice_id}/stream`.
pub struct ElevenLabsClient {
    client: Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    /// Create a client.
    pub fn new(config: ElevenLabsConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn stream_url(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{voice_id}/stream",
            self.config.base_url
        )
    }
}

#[async_trait]
impl SynthesisClient for ElevenLabsClient {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    #[instrument(skip_all, fields(voice_id = %request.voice_id, model = %self.config.model_id))]
    async fn synthesize(&self, request: &VoiceRequest) -> Result<AudioStream, SynthesisError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let resp = self
            .client
            .post(self.stream_url(&request.voice_id))
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", self.config.api_key.expose_secret())
            .header("accept", "audio/mpeg")
            .json(&SynthesisBody {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .await
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SynthesisError::from_status(status, body));
        }

        debug!(chars = text.len(), "synthesis accepted");
        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| SynthesisError::StreamInterrupted(e.to_string())));
        Ok(Box::pin(stream))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ElevenLabsClient {
        ElevenLabsClient::new(ElevenLabsConfig {
            base_url: server.uri(),
            api_key: SecretString::from("xi-test"),
            model_id: "eleven_flash_v2_5".into(),
            output_format: "mp3_44100_128".into(),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn request(text: &str) -> VoiceRequest {
        VoiceRequest {
            speaker: "alice".into(),
            voice_id: "voice123".into(),
            text: text.into(),
        }
    }

    async fn collect(mut stream: AudioStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn streams_audio_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123/stream"))
            .and(query_param("output_format", "mp3_44100_128"))
            .and(header("xi-api-key", "xi-test"))
            .and(body_json(serde_json::json!({
                "text": "hello there",
                "model_id": "eleven_flash_v2_5",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fakeaudio".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let stream = client_for(&server)
            .synthesize(&request("  hello there "))
            .await
            .unwrap();
        assert_eq!(collect(stream).await, b"ID3fakeaudio");
    }

    #[tokio::test]
    async fn empty_text_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server).synthesize(&request("   ")).await;
        assert!(matches!(result, Err(SynthesisError::EmptyText)));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let Err(err) = client_for(&server).synthesize(&request("hi")).await else {
            panic!("expected error");
        };
        assert_eq!(
            err,
            SynthesisError::AuthenticationFailed("invalid api key".into())
        );
    }

    #[tokio::test]
    async fn server_error_body_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(2_000)))
            .mount(&server)
            .await;

        let Err(SynthesisError::ServerError { status, body }) =
            client_for(&server).synthesize(&request("hi")).await
        else {
            panic!("expected server error");
        };
        assert_eq!(status, 500);
        assert_eq!(body.len(), MAX_ERROR_BODY);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let client = ElevenLabsClient::new(ElevenLabsConfig {
            base_url: "http://127.0.0.1:1".into(),
            api_key: SecretString::from("xi-test"),
            model_id: "m".into(),
            output_format: "f".into(),
            connect_timeout: Duration::from_millis(500),
        })
        .unwrap();
        let result = client.synthesize(&request("hi")).await;
        assert!(matches!(result, Err(SynthesisError::NetworkError(_))));
    }

    #[test]
    fn config_requires_api_key() {
        let mut settings = TtsSettings::default();
        assert!(matches!(
            ElevenLabsConfig::from_settings(&settings),
            Err(SynthesisError::AuthenticationFailed(_))
        ));

        settings.api_key = Some(SecretString::from("k"));
        settings.base_url = "https://api.example.test/".into();
        let config = ElevenLabsConfig::from_settings(&settings).unwrap();
        assert_eq!(config.base_url, "https://api.example.test");
        assert_eq!(config.model_id, "eleven_flash_v2_5");
    }
}
