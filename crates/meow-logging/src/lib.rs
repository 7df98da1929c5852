//! # meow-logging
//!
//! Installs the global `tracing` subscriber.
//!
//! The filter is built from [`LoggingSettings`]: a default level plus
//! per-target overrides. `RUST_LOG`, when set and valid, replaces it
//! entirely. Output is either human-readable or one JSON object per line.

#![deny(unsafe_code)]

use std::str::FromStr;

use meow_settings::{LogFormat, LoggingSettings};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// What [`init_logging`] ended up installing.
#[derive(Clone, Debug)]
pub struct LoggingGuard {
    directive: String,
    format: LogFormat,
    installed: bool,
}

impl LoggingGuard {
    /// The effective filter directive.
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// The output format.
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// False when another global subscriber was already set.
    pub fn installed(&self) -> bool {
        self.installed
    }
}

/// Initialize logging. Call once at startup; later calls are no-ops.
pub fn init_logging(settings: &LoggingSettings) -> LoggingGuard {
    let configured = build_filter_directive(settings);
    let (filter, directive) = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(from_env) if !from_env.is_empty() => match EnvFilter::try_new(&from_env) {
            Ok(filter) => (filter, from_env),
            Err(_) => (EnvFilter::new(&configured), configured),
        },
        _ => (EnvFilter::new(&configured), configured),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .is_ok(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .is_ok(),
    };

    LoggingGuard {
        directive,
        format: settings.format,
        installed,
    }
}

/// Build an `EnvFilter` directive string from settings.
///
/// Unknown levels fall back to `info`. Overrides with unknown levels are
/// dropped.
pub fn build_filter_directive(settings: &LoggingSettings) -> String {
    let mut directive = normalize_level(&settings.level).unwrap_or("info").to_string();
    for (target, level) in &settings.modules {
        let target = target.trim();
        if target.is_empty() {
            continue;
        }
        if let Some(level) = normalize_level(level) {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(level);
        }
    }
    directive
}

fn normalize_level(level: &str) -> Option<&'static str> {
    let level = Level::from_str(level.trim()).ok()?;
    Some(match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
