//! EventSub websocket message decoding.
//!
//! Every frame from the EventSub websocket is a JSON object with a
//! `metadata` block naming the message type and a type-specific `payload`.
//! Decoding is pure so it can be tested without a socket.

use meow_core::Event;
use serde::Deserialize;

use crate::errors::EventSubError;

/// Subscription type for chat messages.
pub const CHANNEL_CHAT_MESSAGE: &str = "channel.chat.message";
/// Subscription type for cheers.
pub const CHANNEL_CHEER: &str = "channel.cheer";
/// Subscription type for the stream going live.
pub const STREAM_ONLINE: &str = "stream.online";

/// Speaker recorded for anonymous cheers.
pub const ANONYMOUS: &str = "anonymous";

/// A decoded EventSub websocket message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// First message on a new session.
    Welcome {
        /// Session id used when creating subscriptions.
        session_id: String,
        /// Seconds the server may stay silent before the session is dead.
        keepalive_timeout_secs: Option<u64>,
    },
    /// Liveness ping with no content.
    Keepalive,
    /// A subscribed event fired.
    Notification(Notification),
    /// The server asks the client to move to `url`.
    Reconnect {
        /// Replacement session URL.
        url: String,
    },
    /// A subscription was revoked.
    Revocation {
        /// Revoked subscription type.
        subscription_type: String,
        /// Twitch's reason, e.g. `authorization_revoked`.
        status: String,
    },
    /// Any other message type.
    Other(String),
}

/// A subscribed event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// `channel.chat.message`
    ChatMessage {
        /// Chatter login.
        login: String,
        /// Message text.
        text: String,
    },
    /// `channel.cheer`
    Cheer {
        /// Cheerer login, `None` when anonymous.
        login: Option<String>,
        /// Bits cheered.
        bits: u32,
        /// Message text including cheermotes.
        message: String,
    },
    /// `stream.online`
    StreamOnline {
        /// Broadcaster login.
        broadcaster_login: String,
    },
    /// A subscription type this listener does not handle.
    Unhandled(String),
}

impl Notification {
    /// Convert to a pipeline event. Stream-online and unhandled types are not
    /// pipeline events.
    pub fn into_event(self) -> Option<Event> {
        match self {
            Self::ChatMessage { login, text } => Some(Event::chat(login, text)),
            Self::Cheer {
                login,
                bits,
                message,
            } => Some(Event::cheer(
                login.unwrap_or_else(|| ANONYMOUS.to_string()),
                bits,
                message,
            )),
            Self::StreamOnline { .. } | Self::Unhandled(_) => None,
        }
    }
}

// ── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
    metadata: Metadata,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct Metadata {
    message_type: String,
    #[serde(default)]
    subscription_type: Option<String>,
}

#[derive(Deserialize)]
struct SessionPayload {
    session: Session,
}

#[derive(Deserialize)]
struct Session {
    id: String,
    #[serde(default)]
    keepalive_timeout_seconds: Option<u64>,
    #[serde(default)]
    reconnect_url: Option<String>,
}

#[derive(Deserialize)]
struct EventPayload<T> {
    event: T,
}

#[derive(Deserialize)]
struct ChatMessageEvent {
    chatter_user_login: String,
    message: ChatText,
}

#[derive(Deserialize)]
struct ChatText {
    text: String,
}

#[derive(Deserialize)]
struct CheerEvent {
    #[serde(default)]
    is_anonymous: bool,
    #[serde(default)]
    user_login: Option<String>,
    bits: u32,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct StreamOnlineEvent {
    broadcaster_user_login: String,
}

#[derive(Deserialize)]
struct RevocationPayload {
    subscription: RevokedSubscription,
}

#[derive(Deserialize)]
struct RevokedSubscription {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

/// Decode one websocket text frame.
pub fn parse_message(text: &str) -> Result<Inbound, EventSubError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(protocol)?;

    match envelope.metadata.message_type.as_str() {
        "session_welcome" => {
            let SessionPayload { session } =
                serde_json::from_value(envelope.payload).map_err(protocol)?;
            Ok(Inbound::Welcome {
                session_id: session.id,
                keepalive_timeout_secs: session.keepalive_timeout_seconds,
            })
        }
        "session_keepalive" => Ok(Inbound::Keepalive),
        "session_reconnect" => {
            let SessionPayload { session } =
                serde_json::from_value(envelope.payload).map_err(protocol)?;
            let url = session
                .reconnect_url
                .ok_or_else(|| EventSubError::Protocol("reconnect without url".into()))?;
            Ok(Inbound::Reconnect { url })
        }
        "notification" => {
            let kind = envelope.metadata.subscription_type.unwrap_or_default();
            parse_notification(&kind, envelope.payload).map(Inbound::Notification)
        }
        "revocation" => {
            let RevocationPayload { subscription } =
                serde_json::from_value(envelope.payload).map_err(protocol)?;
            Ok(Inbound::Revocation {
                subscription_type: subscription.kind,
                status: subscription.status,
            })
        }
        other => Ok(Inbound::Other(other.to_string())),
    }
}

fn parse_notification(
    kind: &str,
    payload: serde_json::Value,
) -> Result<Notification, EventSubError> {
    match kind {
        CHANNEL_CHAT_MESSAGE => {
            let EventPayload::<ChatMessageEvent> { event } =
                serde_json::from_value(payload).map_err(protocol)?;
            Ok(Notification::ChatMessage {
                login: event.chatter_user_login,
                text: event.message.text,
            })
        }
        CHANNEL_CHEER => {
            let EventPayload::<CheerEvent> { event } =
                serde_json::from_value(payload).map_err(protocol)?;
            let login = if event.is_anonymous {
                None
            } else {
                event.user_login.filter(|l| !l.is_empty())
            };
            Ok(Notification::Cheer {
                login,
                bits: event.bits,
                message: event.message,
            })
        }
        STREAM_ONLINE => {
            let EventPayload::<StreamOnlineEvent> { event } =
                serde_json::from_value(payload).map_err(protocol)?;
            Ok(Notification::StreamOnline {
                broadcaster_login: event.broadcaster_user_login,
            })
        }
        other => Ok(Notification::Unhandled(other.to_string())),
    }
}

fn protocol(e: serde_json::Error) -> EventSubError {
    EventSubError::Protocol(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn notification(kind: &str, event: serde_json::Value) -> String {
        json!({
            "metadata": {
                "message_id": "m1",
                "message_type": "notification",
                "message_timestamp": "2024-01-01T00:00:00Z",
                "subscription_type": kind,
                "subscription_version": "1"
            },
            "payload": {
                "subscription": {"type": kind},
                "event": event
            }
        })
        .to_string()
    }

    #[test]
    fn welcome() {
        let text = json!({
            "metadata": {"message_id": "w", "message_type": "session_welcome"},
            "payload": {"session": {
                "id": "sess-1",
                "status": "connected",
                "keepalive_timeout_seconds": 10,
                "reconnect_url": null
            }}
        })
        .to_string();
        assert_eq!(
            parse_message(&text).unwrap(),
            Inbound::Welcome {
                session_id: "sess-1".into(),
                keepalive_timeout_secs: Some(10)
            }
        );
    }

    #[test]
    fn keepalive() {
        let text = r#"{"metadata":{"message_type":"session_keepalive"},"payload":{}}"#;
        assert_eq!(parse_message(text).unwrap(), Inbound::Keepalive);
    }

    #[test]
    fn reconnect_carries_url() {
        let text = json!({
            "metadata": {"message_type": "session_reconnect"},
            "payload": {"session": {"id": "s", "reconnect_url": "wss://example.test/ws?id=2"}}
        })
        .to_string();
        assert_eq!(
            parse_message(&text).unwrap(),
            Inbound::Reconnect {
                url: "wss://example.test/ws?id=2".into()
            }
        );
    }

    #[test]
    fn reconnect_without_url_is_protocol_error() {
        let text = json!({
            "metadata": {"message_type": "session_reconnect"},
            "payload": {"session": {"id": "s"}}
        })
        .to_string();
        assert!(matches!(
            parse_message(&text),
            Err(EventSubError::Protocol(_))
        ));
    }

    #[test]
    fn chat_message_to_event() {
        let text = notification(
            CHANNEL_CHAT_MESSAGE,
            json!({
                "broadcaster_user_id": "1",
                "chatter_user_login": "alice",
                "chatter_user_name": "Alice",
                "message": {"text": "!tts hello", "fragments": []}
            }),
        );
        let Inbound::Notification(n) = parse_message(&text).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(n.into_event(), Some(Event::chat("alice", "!tts hello")));
    }

    #[test]
    fn cheer_to_event() {
        let text = notification(
            CHANNEL_CHEER,
            json!({
                "is_anonymous": false,
                "user_login": "carol",
                "bits": 50,
                "message": "Cheer50 nice stream"
            }),
        );
        let Inbound::Notification(n) = parse_message(&text).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(
            n.into_event(),
            Some(Event::cheer("carol", 50, "Cheer50 nice stream"))
        );
    }

    #[test]
    fn anonymous_cheer_speaker() {
        let text = notification(
            CHANNEL_CHEER,
            json!({"is_anonymous": true, "user_login": null, "bits": 100, "message": "Cheer100"}),
        );
        let Inbound::Notification(n) = parse_message(&text).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(n.into_event().unwrap().speaker(), ANONYMOUS);
    }

    #[test]
    fn stream_online_is_not_pipeline_event() {
        let text = notification(
            STREAM_ONLINE,
            json!({"broadcaster_user_login": "streamer", "type": "live"}),
        );
        let Inbound::Notification(n) = parse_message(&text).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(
            n,
            Notification::StreamOnline {
                broadcaster_login: "streamer".into()
            }
        );
        assert!(n.into_event().is_none());
    }

    #[test]
    fn unhandled_subscription_type() {
        let text = notification("channel.follow", json!({"user_login": "x"}));
        assert_eq!(
            parse_message(&text).unwrap(),
            Inbound::Notification(Notification::Unhandled("channel.follow".into()))
        );
    }

    #[test]
    fn revocation() {
        let text = json!({
            "metadata": {"message_type": "revocation", "subscription_type": "channel.cheer"},
            "payload": {"subscription": {"type": "channel.cheer", "status": "authorization_revoked"}}
        })
        .to_string();
        assert_eq!(
            parse_message(&text).unwrap(),
            Inbound::Revocation {
                subscription_type: "channel.cheer".into(),
                status: "authorization_revoked".into()
            }
        );
    }

    #[test]
    fn malformed_payload_is_protocol_error() {
        let text = notification(CHANNEL_CHEER, json!({"user_login": "x"}));
        assert!(matches!(
            parse_message(&text),
            Err(EventSubError::Protocol(_))
        ));
        assert!(parse_message("not json").is_err());
    }
}
