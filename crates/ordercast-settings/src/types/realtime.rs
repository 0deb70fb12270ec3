//! Session registry and expiry sweeper settings.

use serde::{Deserialize, Serialize};

/// Settings for the real-time session layer.
///
/// Timeout and sweep interval are deliberately independent: a session can
/// outlive its timeout by up to one sweep interval before eviction.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// How long a session stays live without a heartbeat, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// How often the sweeper scans both registries, in milliseconds.
    pub sweep_interval_ms: u64,
    /// Per-connection outbound queue capacity (messages).
    pub send_queue_size: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 300_000,
            sweep_interval_ms: 60_000,
            send_queue_size: 256,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
