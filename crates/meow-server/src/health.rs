//! `/health` endpoint.

use std::time::Instant;

use meow_core::PlaybackState;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Current websocket connection count.
    pub connections: usize,
    /// Events waiting on the bus.
    pub pending_events: usize,
    /// What the dispatcher is doing right now.
    pub playback: PlaybackState,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    pending_events: usize,
    playback: PlaybackState,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        pending_events,
        playback,
    }
}
