//! In-process domain event bus.
//!
//! A single `tokio::sync::broadcast` channel carries the full order event
//! stream; each dispatcher subscribes once and matches exhaustively on the
//! event kind. Slow subscribers that fall behind skip events
//! (`RecvError::Lagged`) — acceptable for the live-notification path, whose
//! durable counterpart is the broker.

use tokio::sync::broadcast;

use ordercast_core::OrderEvent;

/// Capacity of the broadcast channel before slow receivers start lagging.
const BUS_CAPACITY: usize = 1024;

/// Counter: events published to the bus.
pub const METRIC_EVENTS_PUBLISHED: &str = "order_events_published_total";

/// Cloneable handle to the in-process event bus.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the full event stream. Each dispatcher calls this once
    /// to get its own receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was handed to. Publishing
    /// with no subscribers is not an error — the event is simply dropped,
    /// which matches fire-and-forget semantics.
    pub fn publish(&self, event: OrderEvent) -> usize {
        let kind = event.kind;
        let order_id = event.order.id.clone();
        // send() errs only when there are no receivers — that's fine.
        let delivered = self.sender.send(event).unwrap_or(0);
        metrics::counter!(METRIC_EVENTS_PUBLISHED).increment(1);
        tracing::debug!(%kind, %order_id, delivered, "published order event");
        delivered
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
