//! HTTP/WebSocket server network settings.

use serde::{Deserialize, Serialize};

/// Network settings for the combined HTTP + WebSocket server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` asks the OS for a free port (used by tests).
    pub port: u16,
    /// Maximum concurrently open channels across both endpoints.
    pub max_connections: usize,
    /// Maximum accepted inbound text-frame size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 1000,
            max_message_size: 64 * 1024,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
