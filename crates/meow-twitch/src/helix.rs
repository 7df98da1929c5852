//! Minimal Helix REST client: EventSub subscriptions and chat messages.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::errors::EventSubError;
use crate::messages::{CHANNEL_CHAT_MESSAGE, CHANNEL_CHEER, STREAM_ONLINE};

/// Authenticated Helix client.
#[derive(Clone)]
pub struct HelixClient {
    client: Client,
    base_url: String,
    client_id: String,
    access_token: SecretString,
}

impl std::fmt::Debug for HelixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelixClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl HelixClient {
    /// Create a client for `base_url` (e.g. `https://api.twitch.tv/helix`).
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            access_token,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, EventSubError> {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header("Client-Id", &self.client_id)
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| EventSubError::Http(e.to_string()))
    }

    /// Create one websocket-transport subscription bound to `session_id`.
    pub async fn subscribe(
        &self,
        session_id: &str,
        subscription_type: &str,
        condition: Value,
    ) -> Result<(), EventSubError> {
        let body = json!({
            "type": subscription_type,
            "version": "1",
            "condition": condition,
            "transport": {"method": "websocket", "session_id": session_id},
        });
        let resp = self.post("/eventsub/subscriptions", &body).await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EventSubError::Subscribe {
                subscription: subscription_type.to_string(),
                status,
                body,
            });
        }
        debug!(subscription_type, "subscribed");
        Ok(())
    }

    /// Subscribe to every type the listener handles.
    pub async fn subscribe_all(
        &self,
        session_id: &str,
        owner_id: &str,
        bot_id: &str,
    ) -> Result<(), EventSubError> {
        for (kind, condition) in subscription_conditions(owner_id, bot_id) {
            self.subscribe(session_id, kind, condition).await?;
        }
        info!(session_id, "eventsub subscriptions created");
        Ok(())
    }

    /// Post a chat message to `broadcaster_id`'s chat as `sender_id`.
    pub async fn send_chat_message(
        &self,
        broadcaster_id: &str,
        sender_id: &str,
        message: &str,
    ) -> Result<(), EventSubError> {
        let body = json!({
            "broadcaster_id": broadcaster_id,
            "sender_id": sender_id,
            "message": message,
        });
        let resp = self.post("/chat/messages", &body).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EventSubError::Http(format!("chat message rejected ({status}): {body}")));
        }
        Ok(())
    }
}

/// Subscription types and their conditions, in creation order.
pub fn subscription_conditions(owner_id: &str, bot_id: &str) -> [(&'static str, Value); 3] {
    [
        (
            CHANNEL_CHAT_MESSAGE,
            json!({"broadcaster_user_id": owner_id, "user_id": bot_id}),
        ),
        (CHANNEL_CHEER, json!({"broadcaster_user_id": owner_id})),
        (STREAM_ONLINE, json!({"broadcaster_user_id": owner_id})),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn helix(server: &MockServer) -> HelixClient {
        HelixClient::new(server.uri(), "cid", SecretString::from("tok"))
    }

    #[tokio::test]
    async fn subscribe_all_creates_three_subscriptions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .and(header("Client-Id", "cid"))
            .and(header("Authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "transport": {"method": "websocket", "session_id": "sess-1"}
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"data": []})))
            .expect(3)
            .mount(&server)
            .await;

        helix(&server).subscribe_all("sess-1", "100", "200").await.unwrap();
    }

    #[tokio::test]
    async fn chat_subscription_condition_includes_bot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "type": "channel.chat.message",
                "condition": {"broadcaster_user_id": "100", "user_id": "200"}
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        helix(&server).subscribe_all("s", "100", "200").await.unwrap();
    }

    #[tokio::test]
    async fn rejected_subscription_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("missing scope"))
            .mount(&server)
            .await;

        let err = helix(&server)
            .subscribe("s", CHANNEL_CHEER, json!({}))
            .await
            .unwrap_err();
        let EventSubError::Subscribe { status, body, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(*status, 403);
        assert_eq!(body, "missing scope");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn send_chat_message_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/messages"))
            .and(body_partial_json(json!({
                "broadcaster_id": "100",
                "sender_id": "200",
                "message": "hello chat"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        helix(&server)
            .send_chat_message("100", "200", "hello chat")
            .await
            .unwrap();
    }

    #[test]
    fn debug_hides_token() {
        let client = HelixClient::new("https://api.example.test/", "cid", SecretString::from("tok"));
        let debug = format!("{client:?}");
        assert!(!debug.contains("tok\""));
        assert!(debug.contains("https://api.example.test\""));
    }
}
