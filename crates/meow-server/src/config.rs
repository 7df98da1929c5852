//! Server configuration.

use std::time::Duration;

use meow_settings::ServerSettings;

/// Runtime configuration for [`MeowServer`](crate::server::MeowServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Interval between websocket pings.
    pub heartbeat_interval: Duration,
    /// Close a connection after this long without client activity.
    pub heartbeat_timeout: Duration,
    /// Frames buffered per connection before sends wait on the writer.
    pub send_queue: usize,
    /// How long shutdown waits for background tasks.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            send_queue: 256,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
            heartbeat_timeout: Duration::from_millis(settings.heartbeat_timeout_ms),
            send_queue: settings.send_queue.max(1),
            shutdown_timeout: Duration::from_millis(settings.shutdown_timeout_ms),
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
