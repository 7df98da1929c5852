//! # meow-settings
//!
//! Layered configuration for meowtts.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`MeowSettings::default()`])
//! 2. **Settings file** (`MEOW_SETTINGS` or `./meowtts.json`, deep-merged over defaults)
//! 3. **Environment variables** (highest priority; secrets only come from here)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, load_with,
    settings_path,
};
pub use types::*;
