//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MeowSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{LogFormat, MeowSettings};

/// Env var naming the settings file.
pub const SETTINGS_PATH_ENV: &str = "MEOW_SETTINGS";

/// Resolve the settings file path: `MEOW_SETTINGS`, else `./meowtts.json`.
pub fn settings_path() -> PathBuf {
    std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from("meowtts.json"), PathBuf::from)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MeowSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<MeowSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Load settings using `lookup` in place of the process environment.
pub fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<MeowSettings> {
    let defaults = serde_json::to_value(MeowSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MeowSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut MeowSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Empty values are treated as unset. Values that fail to parse are logged
/// and ignored.
pub fn apply_overrides(settings: &mut MeowSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = Env(lookup);

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("MEOW_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("MEOW_PORT", |s| parse_u16_range(s, 0, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("MEOW_HEARTBEAT_INTERVAL_MS", |s| {
        parse_u64_range(s, 1_000, 600_000)
    }) {
        settings.server.heartbeat_interval_ms = v;
    }
    if let Some(v) = env.parsed("MEOW_HEARTBEAT_TIMEOUT_MS", |s| {
        parse_u64_range(s, 1_000, 3_600_000)
    }) {
        settings.server.heartbeat_timeout_ms = v;
    }
    if let Some(v) = env.parsed("MEOW_SEND_QUEUE", |s| parse_usize_range(s, 1, 65_536)) {
        settings.server.send_queue = v;
    }

    // ── Dispatch ────────────────────────────────────────────────────
    if let Some(v) = env.parsed("MEOW_MIN_BITS", |s| parse_u32_range(s, 0, u32::MAX)) {
        settings.dispatch.min_bits = v;
    }
    if let Some(v) = env.string("ADMIN_USERS") {
        settings.dispatch.admin_users = parse_list(&v);
    }
    if let Some(v) = env.raw("MEOW_COMMAND_PREFIX") {
        settings.dispatch.command_prefix = v;
    }

    // ── TTS ─────────────────────────────────────────────────────────
    if let Some(v) = env.string("ELEVENLABS_API_KEY") {
        settings.tts.api_key = Some(SecretString::from(v));
    }
    if let Some(v) = env.string("ELEVENLABS_MODEL_ID") {
        settings.tts.model_id = v;
    }
    if let Some(v) = env.string("ELEVENLABS_OUTPUT_FORMAT") {
        settings.tts.output_format = v;
    }
    if let Some(v) = env.string("ELEVENLABS_BASE_URL") {
        settings.tts.base_url = v;
    }
    if let Some(v) = env.string("MEOW_DEFAULT_VOICE_ID") {
        settings.tts.default_voice_id = v;
    }
    if let Some(v) = env.parsed("MEOW_VOICES", parse_voice_map) {
        settings.tts.voices = v;
    }

    // ── Twitch ──────────────────────────────────────────────────────
    if let Some(v) = env.string("TWITCH_CLIENT_ID") {
        settings.twitch.client_id = v;
    }
    if let Some(v) = env.string("TWITCH_ACCESS_TOKEN") {
        settings.twitch.access_token = Some(SecretString::from(v));
    }
    if let Some(v) = env.string("TWITCH_OWNER_ID") {
        settings.twitch.owner_id = v;
    }
    if let Some(v) = env.string("TWITCH_BOT_ID") {
        settings.twitch.bot_id = v;
    }
    if let Some(v) = env.string("TWITCH_EVENTSUB_URL") {
        settings.twitch.eventsub_url = v;
    }
    if let Some(v) = env.string("TWITCH_HELIX_URL") {
        settings.twitch.helix_url = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("MEOW_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("MEOW_LOG_FORMAT", LogFormat::parse) {
        settings.logging.format = v;
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Value exactly as set, including surrounding whitespace.
    fn raw(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `name=id,name=id`. Any malformed entry rejects the whole value.
pub fn parse_voice_map(val: &str) -> Option<BTreeMap<String, String>> {
    let mut voices = BTreeMap::new();
    for entry in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, id) = entry.split_once('=')?;
        let (name, id) = (name.trim(), id.trim());
        if name.is_empty() || id.is_empty() {
            return None;
        }
        let _ = voices.insert(name.to_lowercase(), id.to_string());
    }
    (!voices.is_empty()).then_some(voices)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
