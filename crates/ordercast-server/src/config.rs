//! Server configuration.

use std::time::Duration;

use ordercast_settings::OrdercastSettings;

/// Configuration for the ordercast server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrently open channels across both endpoints.
    pub max_connections: usize,
    /// Max accepted WebSocket message size in bytes.
    pub max_message_size: usize,
    /// How long a session stays live without a heartbeat.
    pub heartbeat_timeout: Duration,
    /// How often the sweeper scans both registries.
    pub sweep_interval: Duration,
    /// Per-connection outbound queue capacity (messages).
    pub send_queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1000,
            max_message_size: 64 * 1024,
            heartbeat_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            send_queue_size: 256,
        }
    }
}

impl ServerConfig {
    /// Build a server config from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &OrdercastSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_connections: settings.server.max_connections,
            max_message_size: settings.server.max_message_size,
            heartbeat_timeout: Duration::from_millis(settings.realtime.heartbeat_timeout_ms),
            sweep_interval: Duration::from_millis(settings.realtime.sweep_interval_ms),
            send_queue_size: settings.realtime.send_queue_size,
        }
    }
}
