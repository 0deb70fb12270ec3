//! Published messages and queue-side deliveries.

use std::sync::Arc;
use tokio::time::Instant;

/// A message as handed to an exchange: routing key + serialized payload.
///
/// The payload is shared, not copied, when a fan-out exchange enqueues it on
/// multiple queues.
#[derive(Clone, Debug)]
pub struct Message {
    /// Routing key; empty for fan-out publishes.
    pub routing_key: String,
    /// Serialized JSON payload.
    pub payload: Arc<str>,
}

impl Message {
    /// Create a message from a routing key and payload.
    pub fn new(routing_key: impl Into<String>, payload: impl Into<Arc<str>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: payload.into(),
        }
    }
}

/// A message sitting on (or consumed from) one durable queue.
///
/// Tags are per-queue and strictly increasing; a consumer acknowledges or
/// rejects a delivery by its tag.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Per-queue delivery tag.
    pub tag: u64,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Serialized JSON payload.
    pub payload: Arc<str>,
    /// When the queue accepted the message.
    pub published_at: Instant,
    /// TTL deadline; `None` on queues without a TTL.
    pub expires_at: Option<Instant>,
    /// True when the delivery was returned to the queue after a failed
    /// consume.
    pub redelivered: bool,
}

impl Delivery {
    /// Whether the TTL deadline has passed.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn message_payload_is_shared() {
        let message = Message::new("order.stat.create", "{}");
        let clone = message.clone();
        assert!(Arc::ptr_eq(&message.payload, &clone.payload));
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_without_ttl_never_expires() {
        let delivery = Delivery {
            tag: 1,
            routing_key: String::new(),
            payload: Arc::from("{}"),
            published_at: Instant::now(),
            expires_at: None,
            redelivered: false,
        };
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!delivery.is_expired(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_expires_at_deadline() {
        let now = Instant::now();
        let delivery = Delivery {
            tag: 1,
            routing_key: "order.stat.create".to_owned(),
            payload: Arc::from("{}"),
            published_at: now,
            expires_at: Some(now + Duration::from_secs(120)),
            redelivered: false,
        };
        assert!(!delivery.is_expired(now));
        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(!delivery.is_expired(Instant::now()));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(delivery.is_expired(Instant::now()));
    }
}
