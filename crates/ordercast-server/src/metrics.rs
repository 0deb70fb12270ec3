//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Names of every series this crate emits; the broker's own series are
// documented in `ordercast_bus::broker`.

/// Sessions registered total (counter, labels: registry).
pub const SESSIONS_REGISTERED_TOTAL: &str = "sessions_registered_total";
/// Heartbeats received total (counter, labels: registry).
pub const HEARTBEATS_TOTAL: &str = "heartbeats_total";
/// Pushes handed to a session queue total (counter, labels: registry).
pub const SESSION_PUSHES_TOTAL: &str = "session_pushes_total";
/// Pushes dropped on a full or closed session queue total (counter, labels: registry).
pub const SESSION_PUSH_DROPS_TOTAL: &str = "session_push_drops_total";
/// Sessions evicted by the heartbeat sweeper total (counter, labels: registry).
pub const SESSIONS_SWEPT_TOTAL: &str = "sessions_swept_total";
/// Registered sessions right now (gauge, labels: registry).
pub const SESSIONS_ACTIVE: &str = "sessions_active";
/// WebSocket connections opened total (counter, labels: endpoint).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter, labels: endpoint).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection lifetime seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Events seen per dispatcher total (counter, labels: dispatcher).
pub const DISPATCHER_EVENTS_TOTAL: &str = "dispatcher_events_total";
