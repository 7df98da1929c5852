//! Observable playback state of the dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the dispatcher is in handling the current event.
///
/// Cycles `Idle → Synthesizing → Broadcasting → Idle`. At most one event is
/// ever past `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Waiting for the next qualifying event.
    #[default]
    Idle,
    /// Waiting on the TTS provider to start streaming.
    Synthesizing,
    /// Streaming frames to connected clients.
    Broadcasting,
}

impl PlaybackState {
    /// Lowercase name, as reported by `/health`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Synthesizing => "synthesizing",
            Self::Broadcasting => "broadcasting",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }

    #[test]
    fn serde_matches_display() {
        for state in [
            PlaybackState::Idle,
            PlaybackState::Synthesizing,
            PlaybackState::Broadcasting,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
