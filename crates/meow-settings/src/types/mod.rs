//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the settings file.
//! Each type implements [`Default`] with production values, and `#[serde(default)]`
//! allows partial JSON: missing fields keep their default.
//!
//! Secrets are never read from or written to the settings file. They are
//! `#[serde(skip)]` and only filled from the environment.

mod server;
mod services;

pub use server::*;
pub use services::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 4444 },
///   "dispatch": { "adminUsers": ["somebody"] },
///   "tts": { "voices": { "robot": "abc123" } }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeowSettings {
    /// HTTP/websocket server settings.
    pub server: ServerSettings,
    /// Event routing rules.
    pub dispatch: DispatchSettings,
    /// Speech synthesis provider settings.
    pub tts: TtsSettings,
    /// Chat-platform listener settings.
    pub twitch: TwitchSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl MeowSettings {
    /// Reject combinations the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.server.send_queue == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueue must be at least 1".into(),
            ));
        }
        if self.server.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeatIntervalMs must be positive".into(),
            ));
        }
        if self.server.heartbeat_timeout_ms < self.server.heartbeat_interval_ms {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeatTimeoutMs ({}) is shorter than heartbeatIntervalMs ({})",
                self.server.heartbeat_timeout_ms, self.server.heartbeat_interval_ms
            )));
        }
        if self.tts.default_voice_id.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "tts.defaultVoiceId must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
