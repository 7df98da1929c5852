//! Server, dispatch and logging settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// HTTP/websocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks an ephemeral port.
    pub port: u16,
    /// Interval between websocket pings, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Close a connection after this long without any client activity.
    pub heartbeat_timeout_ms: u64,
    /// Outbound frames buffered per connection before sends wait.
    pub send_queue: usize,
    /// How long shutdown waits for background tasks, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4343,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            send_queue: 256,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Which events are spoken.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Cheers below this many bits are ignored.
    pub min_bits: u32,
    /// Logins allowed to trigger speech from chat. Empty means nobody.
    pub admin_users: Vec<String>,
    /// Chat text marker that introduces a TTS command.
    pub command_prefix: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            min_bits: 10,
            admin_users: Vec::new(),
            command_prefix: "!tts ".to_string(),
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colored when attached to a terminal.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse `pretty` or `json` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Per-target level overrides, e.g. `{"meow_twitch": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            modules: BTreeMap::new(),
        }
    }
}
