//! External service settings: the speech provider and the chat platform.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Speech synthesis provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TtsSettings {
    /// Provider API base URL.
    pub base_url: String,
    /// Synthesis model.
    pub model_id: String,
    /// Encoded audio format requested from the provider.
    pub output_format: String,
    /// Voice used when a message has no tag or an unknown tag.
    pub default_voice_id: String,
    /// Tag name → provider voice id.
    pub voices: BTreeMap<String, String>,
    /// Connect timeout for provider requests, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Provider API key. Environment only.
    #[serde(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for TtsSettings {
    fn default() -> Self {
        let voices = [
            ("stakie", "pW753uRkgLpjrcDGLbgl"),
            ("cowboy", "OYWwCdDHouzDwiZJWOOu"),
            ("funky", "5VUpBkCG0HfPjgfcv2wS"),
        ]
        .into_iter()
        .map(|(name, id)| (name.to_string(), id.to_string()))
        .collect();

        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_flash_v2_5".to_string(),
            output_format: "mp3_44100_128".to_string(),
            default_voice_id: "OYWwCdDHouzDwiZJWOOu".to_string(),
            voices,
            connect_timeout_ms: 10_000,
            api_key: None,
        }
    }
}

/// Twitch EventSub listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwitchSettings {
    /// Whether the listener runs at all.
    pub enabled: bool,
    /// Application client id.
    pub client_id: String,
    /// User id of the channel being listened to.
    pub owner_id: String,
    /// User id of the account that reads chat and posts announcements.
    pub bot_id: String,
    /// EventSub websocket URL.
    pub eventsub_url: String,
    /// Helix REST base URL.
    pub helix_url: String,
    /// Chat message posted when the stream goes live. `None` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_announcement: Option<String>,
    /// User access token. Environment only.
    #[serde(skip)]
    pub access_token: Option<SecretString>,
}

impl Default for TwitchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            client_id: String::new(),
            owner_id: String::new(),
            bot_id: String::new(),
            eventsub_url: "wss://eventsub.wss.twitch.tv/ws".to_string(),
            helix_url: "https://api.twitch.tv/helix".to_string(),
            online_announcement: Some("dave prime activated and at your service".to_string()),
            access_token: None,
        }
    }
}

impl TwitchSettings {
    /// Names of the settings still missing for the listener to start.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.client_id.is_empty() {
            missing.push("TWITCH_CLIENT_ID");
        }
        if self.owner_id.is_empty() {
            missing.push("TWITCH_OWNER_ID");
        }
        if self.bot_id.is_empty() {
            missing.push("TWITCH_BOT_ID");
        }
        if self.access_token.is_none() {
            missing.push("TWITCH_ACCESS_TOKEN");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tts_defaults() {
        let t = TtsSettings::default();
        assert_eq!(t.model_id, "eleven_flash_v2_5");
        assert_eq!(t.output_format, "mp3_44100_128");
        assert_eq!(t.voices.len(), 3);
        assert_eq!(t.voices["stakie"], "pW753uRkgLpjrcDGLbgl");
        assert!(t.api_key.is_none());
    }

    #[test]
    fn twitch_missing_credentials() {
        let mut t = TwitchSettings::default();
        assert_eq!(t.missing_credentials().len(), 4);
        t.client_id = "cid".into();
        t.owner_id = "1".into();
        t.bot_id = "2".into();
        t.access_token = Some("tok".to_owned().into());
        assert!(t.missing_credentials().is_empty());
    }

    #[test]
    fn voices_map_replaced_from_json() {
        let t: TtsSettings = serde_json::from_str(r#"{"voices": {"robot": "r1"}}"#).unwrap();
        assert_eq!(t.voices.len(), 1);
        assert_eq!(t.voices["robot"], "r1");
    }
}
