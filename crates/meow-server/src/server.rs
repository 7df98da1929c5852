//! `MeowServer`: Axum HTTP + websocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use meow_core::{PlaybackState, QueueDepth};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::registry::ConnectionRegistry;
use crate::websocket::{Heartbeat, handle_socket};

const INDEX_HTML: &str = include_str!("../static/index.html");
const APP_JS: &str = include_str!("../static/app.js");

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Events waiting on the bus.
    pub pending: QueueDepth,
    /// Dispatcher playback state.
    pub playback: watch::Receiver<PlaybackState>,
    /// Cancelled on shutdown; closes every socket.
    pub cancel: CancellationToken,
    /// When the server started.
    pub start_time: Instant,
    /// Frames buffered per connection.
    pub send_queue: usize,
    /// Ping schedule for each connection.
    pub heartbeat: Heartbeat,
}

/// The meowtts web server.
pub struct MeowServer {
    config: ServerConfig,
    state: AppState,
}

impl MeowServer {
    /// Create a server over an existing registry.
    pub fn new(
        config: ServerConfig,
        registry: Arc<ConnectionRegistry>,
        pending: QueueDepth,
        playback: watch::Receiver<PlaybackState>,
        cancel: CancellationToken,
    ) -> Self {
        let state = AppState {
            registry,
            pending,
            playback,
            cancel,
            start_time: Instant::now(),
            send_queue: config.send_queue,
            heartbeat: Heartbeat {
                interval: config.heartbeat_interval,
                timeout: config.heartbeat_timeout,
            },
        };
        Self { config, state }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/static/app.js", get(app_js_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve in the background until the cancel token fires.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let cancel = self.state.cancel.clone();

        info!(%addr, "meowtts server listening");
        let handle = tokio::spawn(async move {
            let shutdown = async move { cancel.cancelled().await };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "server stopped with error");
            }
            info!("server stopped");
        });
        Ok((addr, handle))
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/app.js
async fn app_js_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        APP_JS,
    )
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        handle_socket(
            socket,
            state.registry,
            state.send_queue,
            state.heartbeat,
            state.cancel,
        )
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.registry.count().await;
    let playback = *state.playback.borrow();
    Json(health::health_check(
        state.start_time,
        connections,
        state.pending.get(),
        playback,
    ))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use meow_core::{Event, event_bus};
    use tower::ServiceExt;

    use super::*;
    use crate::connection::Connection;

    fn make_server() -> (MeowServer, meow_core::EventSender, watch::Sender<PlaybackState>) {
        let (tx, rx) = event_bus();
        let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);
        let server = MeowServer::new(
            ServerConfig::default(),
            Arc::new(ConnectionRegistry::new()),
            rx.depth(),
            state_rx,
            CancellationToken::new(),
        );
        (server, tx, state_tx)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_live_counters() {
        let (server, tx, state_tx) = make_server();
        let (conn, _rx) = Connection::channel(1);
        let _ = server.registry().add(conn).await;
        tx.put(Event::chat("a", "b"));
        let _ = state_tx.send_replace(PlaybackState::Synthesizing);

        let (status, body) = get_body(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 1);
        assert_eq!(parsed["pending_events"], 1);
        assert_eq!(parsed["playback"], "synthesizing");
    }

    #[tokio::test]
    async fn index_references_script() {
        let (server, _tx, _state) = make_server();
        let (status, body) = get_body(server.router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>meowTTS Browser Source</title>"));
        assert!(body.contains(r#"src="/static/app.js""#));
    }

    #[tokio::test]
    async fn script_served_as_javascript() {
        let (server, _tx, _state) = make_server();
        let req = Request::builder()
            .uri("/static/app.js")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(
            resp.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/javascript")
        );
    }

    #[tokio::test]
    async fn ws_requires_upgrade() {
        let (server, _tx, _state) = make_server();
        let (status, _) = get_body(server.router(), "/ws").await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (server, _tx, _state) = make_server();
        let (status, _) = get_body(server.router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops_on_cancel() {
        let (tx, rx) = event_bus();
        let (_state_tx, state_rx) = watch::channel(PlaybackState::Idle);
        let cancel = CancellationToken::new();
        let server = MeowServer::new(
            ServerConfig::default(),
            Arc::new(ConnectionRegistry::new()),
            rx.depth(),
            state_rx,
            cancel.clone(),
        );
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        drop(tx);
    }
}
