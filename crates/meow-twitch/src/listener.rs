//! The EventSub websocket session loop.
//!
//! One session: connect, wait for `session_welcome`, create subscriptions
//! bound to the session id, then read notifications until the socket drops
//! or the server asks for a reconnect. Chat messages and cheers become
//! [`Event`](meow_core::Event)s on the bus; `stream.online` optionally posts an
//! announcement to chat.
//!
//! A `session_reconnect` moves to the new URL immediately and keeps the
//! existing subscriptions. Any other session end starts over at the
//! configured URL after a backoff delay, with fresh subscriptions.

use std::time::Duration;

use futures::StreamExt;
use meow_core::EventSender;
use meow_settings::TwitchSettings;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::backoff::Backoff;
use crate::errors::EventSubError;
use crate::helix::HelixClient;
use crate::messages::{Inbound, Notification, parse_message};

/// Keepalive window assumed until the welcome message says otherwise.
const DEFAULT_KEEPALIVE_SECS: u64 = 10;
/// Slack added to the server's keepalive window before declaring it dead.
const KEEPALIVE_GRACE_SECS: u64 = 5;

/// Listener configuration.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    /// EventSub websocket URL.
    pub eventsub_url: String,
    /// Channel being listened to.
    pub owner_id: String,
    /// Account reading chat and posting announcements.
    pub bot_id: String,
    /// Chat message posted on `stream.online`.
    pub online_announcement: Option<String>,
}

/// How a session ended without error.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Server asked us to move to this URL.
    Reconnect(String),
    /// Socket closed.
    Closed,
}

/// Feeds Twitch chat messages and cheers onto the event bus.
pub struct EventSubListener {
    config: ListenerConfig,
    helix: HelixClient,
    bus: EventSender,
    backoff: Backoff,
}

impl EventSubListener {
    /// Create a listener.
    pub fn new(config: ListenerConfig, helix: HelixClient, bus: EventSender) -> Self {
        Self {
            config,
            helix,
            bus,
            backoff: Backoff::default(),
        }
    }

    /// Build from settings. Fails when credentials are missing.
    pub fn from_settings(settings: &TwitchSettings, bus: EventSender) -> Result<Self, EventSubError> {
        let missing = settings.missing_credentials();
        let Some(token) = settings.access_token.clone().filter(|_| missing.is_empty()) else {
            return Err(EventSubError::MissingCredentials(missing.join(", ")));
        };
        let helix = HelixClient::new(&settings.helix_url, &settings.client_id, token);
        let config = ListenerConfig {
            eventsub_url: settings.eventsub_url.clone(),
            owner_id: settings.owner_id.clone(),
            bot_id: settings.bot_id.clone(),
            online_announcement: settings
                .online_announcement
                .clone()
                .filter(|m| !m.trim().is_empty()),
        };
        Ok(Self::new(config, helix, bus))
    }

    /// Replace the reconnect schedule.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until cancelled or a non-retryable error occurs.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut url = self.config.eventsub_url.clone();
        let mut subscribe = true;

        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.session(&url, subscribe) => outcome,
            };

            match outcome {
                Ok(SessionEnd::Reconnect(next)) => {
                    info!(url = %next, "eventsub reconnect requested");
                    url = next;
                    subscribe = false;
                    continue;
                }
                Ok(SessionEnd::Closed) => warn!("eventsub session closed"),
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, "eventsub listener stopping");
                    break;
                }
                Err(e) => warn!(error = %e, "eventsub session failed"),
            }

            url.clone_from(&self.config.eventsub_url);
            subscribe = true;
            let delay = self.backoff.next_delay();
            debug!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt = self.backoff.attempt(),
                "eventsub reconnecting"
            );
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        info!("eventsub listener stopped");
    }

    async fn session(&mut self, url: &str, subscribe: bool) -> Result<SessionEnd, EventSubError> {
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| EventSubError::Connect(e.to_string()))?;
        debug!(url, "eventsub socket open");

        let mut keepalive_secs = DEFAULT_KEEPALIVE_SECS;
        loop {
            let window = Duration::from_secs(keepalive_secs + KEEPALIVE_GRACE_SECS);
            let msg = match tokio::time::timeout(window, ws.next()).await {
                Err(_) => return Err(EventSubError::KeepaliveTimeout(keepalive_secs)),
                Ok(None) => return Ok(SessionEnd::Closed),
                Ok(Some(Err(e))) => return Err(EventSubError::Protocol(e.to_string())),
                Ok(Some(Ok(msg))) => msg,
            };

            let text = match msg {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    debug!(?frame, "eventsub close frame");
                    return Ok(SessionEnd::Closed);
                }
                _ => continue,
            };

            let inbound = match parse_message(text.as_str()) {
                Ok(inbound) => inbound,
                Err(e) => {
                    debug!(error = %e, "dropping unparseable eventsub message");
                    continue;
                }
            };

            match inbound {
                Inbound::Welcome {
                    session_id,
                    keepalive_timeout_secs,
                } => {
                    if let Some(secs) = keepalive_timeout_secs {
                        keepalive_secs = secs;
                    }
                    if subscribe {
                        self.helix
                            .subscribe_all(&session_id, &self.config.owner_id, &self.config.bot_id)
                            .await?;
                    }
                    self.backoff.reset();
                    info!(session_id, keepalive_secs, "eventsub session ready");
                }
                Inbound::Keepalive => trace!("eventsub keepalive"),
                Inbound::Notification(notification) => self.dispatch(notification),
                Inbound::Reconnect { url } => {
                    let _ = ws.close(None).await;
                    return Ok(SessionEnd::Reconnect(url));
                }
                Inbound::Revocation {
                    subscription_type,
                    status,
                } => warn!(subscription_type, status, "eventsub subscription revoked"),
                Inbound::Other(kind) => debug!(kind, "ignoring eventsub message"),
            }
        }
    }

    fn dispatch(&self, notification: Notification) {
        if let Notification::StreamOnline { broadcaster_login } = &notification {
            info!(broadcaster = %broadcaster_login, "stream online");
            self.announce();
            return;
        }
        if let Notification::Unhandled(kind) = &notification {
            debug!(kind, "ignoring notification");
            return;
        }
        if let Some(event) = notification.into_event() {
            debug!(kind = event.kind(), speaker = event.speaker(), "event received");
            self.bus.put(event);
        }
    }

    fn announce(&self) {
        let Some(message) = self.config.online_announcement.clone() else {
            return;
        };
        let helix = self.helix.clone();
        let owner = self.config.owner_id.clone();
        let bot = self.config.bot_id.clone();
        drop(tokio::spawn(async move {
            if let Err(e) = helix.send_chat_message(&owner, &bot, &message).await {
                warn!(error = %e, "failed to post online announcement");
            }
        }));
    }
}
