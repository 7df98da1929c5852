//! Voice tag parsing.
//!
//! A message may start with `[name]` to pick a synthesis voice, e.g.
//! `"[cowboy] howdy partner"`. The tag and the whitespace after it are
//! stripped; the name is trimmed and matched case-insensitively against the
//! catalog. Unknown names fall back to the default voice but the tag is still
//! stripped. A tag that is not at the very start, or is unterminated, is not a
//! tag and the text passes through unchanged.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VOICE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s*").expect("voice tag pattern is valid"));

/// A fully resolved synthesis request for one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRequest {
    /// Who triggered the request.
    pub speaker: String,
    /// Provider voice identifier.
    pub voice_id: String,
    /// Text to speak, with any voice tag removed.
    pub text: String,
}

/// Static name → voice-id mapping with a default.
#[derive(Clone, Debug)]
pub struct VoiceCatalog {
    default_voice_id: String,
    voices: HashMap<String, String>,
}

impl VoiceCatalog {
    /// Build a catalog. Names are stored lowercased.
    pub fn new<I, K, V>(default_voice_id: impl Into<String>, voices: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            default_voice_id: default_voice_id.into(),
            voices: voices
                .into_iter()
                .map(|(name, id)| (name.as_ref().trim().to_lowercase(), id.into()))
                .collect(),
        }
    }

    /// The fallback voice.
    pub fn default_voice_id(&self) -> &str {
        &self.default_voice_id
    }

    /// Number of named voices.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Whether no named voices are configured.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Look up a voice by name, falling back to the default.
    pub fn resolve(&self, name: &str) -> &str {
        self.voices
            .get(&name.trim().to_lowercase())
            .map_or(self.default_voice_id.as_str(), String::as_str)
    }

    /// Split a raw message into `(voice_id, cleaned_text)`.
    pub fn parse<'m>(&self, message: &'m str) -> (&str, &'m str) {
        match VOICE_TAG.captures(message) {
            Some(caps) => {
                let whole = caps.get(0).map_or(0, |m| m.end());
                let name = caps.get(1).map_or("", |m| m.as_str());
                (self.resolve(name), &message[whole..])
            }
            None => (self.default_voice_id.as_str(), message),
        }
    }

    /// Parse `message` and attach the speaker.
    pub fn voice_request(&self, speaker: &str, message: &str) -> VoiceRequest {
        let (voice_id, text) = self.parse(message);
        VoiceRequest {
            speaker: speaker.to_owned(),
            voice_id: voice_id.to_owned(),
            text: text.to_owned(),
        }
    }
}
