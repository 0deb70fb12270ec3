//! Broadcast broker settings.

use serde::{Deserialize, Serialize};

/// What a consumer does with a delivery whose processing failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeliveryPolicy {
    /// Acknowledge anyway (at-most-once). The historical behavior.
    #[default]
    Drop,
    /// Return the delivery to its queue marked as redelivered.
    Requeue,
}

/// Settings for the durable broadcast broker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Message TTL on the statistics queue, in milliseconds. Expired
    /// messages dead-letter with their routing key preserved.
    pub stat_ttl_ms: u64,
    /// How often the broker scans TTL queues for expired messages, in
    /// milliseconds.
    pub expiry_tick_ms: u64,
    /// Consumer behavior on processing failure.
    pub redelivery: RedeliveryPolicy,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            stat_ttl_ms: 120_000,
            expiry_tick_ms: 1000,
            redelivery: RedeliveryPolicy::Drop,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
