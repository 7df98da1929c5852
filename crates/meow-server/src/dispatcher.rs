//! The single consumer of the event bus.
//!
//! For each event: decide whether it should be spoken, derive the speaker and
//! text, resolve the voice tag, start synthesis, and broadcast the audio. The
//! next event is not taken off the bus until the current broadcast has sent
//! its `end` frame, so at most one utterance is ever in flight. Every event
//! that qualifies gets exactly one broadcast; when synthesis fails the clients
//! see `start` followed by `end`. Failures are logged and the loop moves on;
//! nothing is retried.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};

use futures::{FutureExt, future, stream};
use meow_core::{Event, EventReceiver, PlaybackState, VoiceCatalog};
use meow_settings::{DispatchSettings, TtsSettings};
use meow_tts::{AudioStream, SynthesisClient, SynthesisError};
use regex::Regex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::broadcast::{BroadcastOutcome, StreamBroadcaster};
use crate::registry::ConnectionRegistry;

/// Cheermote tokens such as `Cheer100`.
static CHEERMOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bCheer\d+\b").expect("cheermote pattern is valid"));

/// Which events are spoken and what text they yield.
#[derive(Clone, Debug)]
pub struct DispatchRules {
    min_bits: u32,
    admins: HashSet<String>,
    command_prefix: String,
}

impl DispatchRules {
    /// Build rules. Admin logins are matched ASCII case-insensitively.
    pub fn new<I, S>(min_bits: u32, admins: I, command_prefix: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            min_bits,
            admins: admins
                .into_iter()
                .map(|a| a.as_ref().trim().to_ascii_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            command_prefix: command_prefix.into(),
        }
    }

    /// Build from loaded settings.
    pub fn from_settings(settings: &DispatchSettings) -> Self {
        Self::new(
            settings.min_bits,
            &settings.admin_users,
            settings.command_prefix.clone(),
        )
    }

    /// Whether `login` may trigger speech from chat.
    pub fn is_admin(&self, login: &str) -> bool {
        self.admins.contains(&login.to_ascii_lowercase())
    }

    /// `(speaker, text)` to synthesize, or `None` if the event is not spoken.
    ///
    /// Chat qualifies when an admin's message contains the command prefix; the
    /// text is everything after its first occurrence. A cheer qualifies at or
    /// above the bit threshold; its cheermote tokens are removed.
    pub fn route<'e>(&self, event: &'e Event) -> Option<(&'e str, String)> {
        match event {
            Event::ChatMessage { speaker, text } => {
                if !self.is_admin(speaker) {
                    return None;
                }
                let (_, command) = text.split_once(self.command_prefix.as_str())?;
                Some((speaker.as_str(), command.trim().to_string()))
            }
            Event::Cheer {
                speaker,
                bits,
                text,
            } => (*bits >= self.min_bits).then(|| (speaker.as_str(), strip_cheermotes(text))),
        }
    }
}

/// Remove `Cheer<digits>` tokens and tidy the whitespace they leave behind.
pub fn strip_cheermotes(text: &str) -> String {
    CHEERMOTE
        .replace_all(text, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drives routing, synthesis and broadcast for every event on the bus.
pub struct Dispatcher {
    rules: DispatchRules,
    catalog: VoiceCatalog,
    synthesizer: Arc<dyn SynthesisClient>,
    broadcaster: Arc<StreamBroadcaster>,
    registry: Arc<ConnectionRegistry>,
    state: watch::Sender<PlaybackState>,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        rules: DispatchRules,
        catalog: VoiceCatalog,
        synthesizer: Arc<dyn SynthesisClient>,
        broadcaster: Arc<StreamBroadcaster>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            rules,
            catalog,
            synthesizer,
            broadcaster,
            registry,
            state,
        }
    }

    /// Build the voice catalog from TTS settings.
    pub fn catalog_from_settings(settings: &TtsSettings) -> VoiceCatalog {
        VoiceCatalog::new(settings.default_voice_id.clone(), &settings.voices)
    }

    /// Watch the playback state.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    fn set_state(&self, state: PlaybackState) {
        let _ = self.state.send_replace(state);
    }

    /// Handle one event to completion.
    ///
    /// Returns the broadcast outcome, or `None` when the event was not spoken.
    #[instrument(skip_all, fields(kind = event.kind(), speaker = event.speaker()))]
    pub async fn handle(&self, event: &Event) -> Option<BroadcastOutcome> {
        let Some((speaker, text)) = self.rules.route(event) else {
            debug!("event does not qualify");
            return None;
        };
        let request = self.catalog.voice_request(speaker, &text);
        info!(voice_id = %request.voice_id, chars = request.text.len(), "speaking");

        self.set_state(PlaybackState::Synthesizing);
        let audio = match self.synthesizer.synthesize(&request).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(
                    provider = self.synthesizer.name(),
                    error = %e,
                    kind = e.error_kind(),
                    "synthesis failed"
                );
                failed(e)
            }
        };

        self.set_state(PlaybackState::Broadcasting);
        let connections = self.registry.snapshot().await;
        let outcome = self.broadcaster.broadcast(connections, audio).await;
        self.set_state(PlaybackState::Idle);
        Some(outcome)
    }

    /// Consume the bus until it closes or `cancel` fires.
    ///
    /// A panic while handling one event is logged and the loop continues.
    pub async fn run(self, mut events: EventReceiver, cancel: CancellationToken) {
        info!(provider = self.synthesizer.name(), "dispatcher started");
        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = events.get() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            if let Err(panic) = AssertUnwindSafe(self.handle(&event)).catch_unwind().await {
                error!(
                    kind = event.kind(),
                    panic = %panic_message(&panic),
                    "event handling panicked"
                );
                self.set_state(PlaybackState::Idle);
            }
        }
        info!("dispatcher stopped");
    }
}

/// An utterance that ends with `error` before producing any audio.
fn failed(error: SynthesisError) -> AudioStream {
    Box::pin(stream::once(future::ready(Err(error))))
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
