//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production default values. Types carry
//! `#[serde(default)]` so partial JSON is accepted — missing fields get their
//! default value during deserialization.

mod broker;
mod realtime;
mod server;

pub use broker::*;
pub use realtime::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the ordercast service.
///
/// Loaded from `~/.ordercast/settings.json` with defaults applied for missing
/// fields. `ORDERCAST_*` environment variables can override specific values.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "version": "0.1.0",
///   "server": { "port": 9090 },
///   "realtime": { "heartbeatTimeoutMs": 60000 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrdercastSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// HTTP/WebSocket server network settings.
    pub server: ServerSettings,
    /// Session registry and sweeper settings.
    pub realtime: RealtimeSettings,
    /// Broadcast broker settings.
    pub broker: BrokerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for OrdercastSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "ordercast".to_string(),
            server: ServerSettings::default(),
            realtime: RealtimeSettings::default(),
            broker: BrokerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum log level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
