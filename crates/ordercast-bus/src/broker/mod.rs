//! In-process message broker with durable queues and dead-lettering.
//!
//! The broker owns the fan-out topology for order notifications and the
//! TTL'd statistics pipeline described in [`topology`]. Publishers hand it
//! serializable records; consumers pop [`Delivery`] values from named queues
//! and ack or nack them. An expiry loop moves timed-out statistics messages
//! to the dead-letter queue.

pub mod delivery;
pub mod exchange;
pub mod queue;
pub mod topology;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use ordercast_core::OrderEvent;

pub use delivery::{Delivery, Message};
pub use exchange::{Exchange, ExchangeKind};
pub use queue::DurableQueue;

use topology::{
    FANOUT_EXCHANGE, NOTIFY_QUEUES, STAT_BINDING, STAT_DEFAULT_TTL, STAT_DLQ, STAT_DLX,
    STAT_EXCHANGE, STAT_QUEUE,
};

/// Counter: messages accepted by an exchange, labelled by exchange name.
pub const METRIC_BROKER_PUBLISHED: &str = "broker_messages_published_total";

/// Counter: messages whose TTL lapsed before consumption, labelled by queue.
pub const METRIC_BROKER_EXPIRED: &str = "broker_messages_expired_total";

/// Counter: messages routed to a dead-letter exchange, labelled by source
/// queue.
pub const METRIC_BROKER_DEAD_LETTERED: &str = "broker_messages_dead_lettered_total";

/// What happens to a delivery its consumer could not process.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RedeliveryPolicy {
    /// The delivery leaves the queue: dead-lettered when the queue has a
    /// dead-letter route, dropped otherwise.
    #[default]
    Drop,
    /// The delivery goes back to the head of its queue for another attempt.
    Requeue,
}

/// Tuning knobs for the broker.
#[derive(Clone, Copy, Debug)]
pub struct BrokerConfig {
    /// TTL applied to the statistics queue.
    pub stat_ttl: Duration,
    /// How often the expiry loop sweeps for timed-out messages.
    pub expiry_tick: Duration,
    /// Consumer failure handling.
    pub redelivery: RedeliveryPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            stat_ttl: STAT_DEFAULT_TTL,
            expiry_tick: Duration::from_secs(1),
            redelivery: RedeliveryPolicy::default(),
        }
    }
}

/// Outcome of a successful publish.
#[derive(Clone, Copy, Debug)]
pub struct PublishReceipt {
    /// Number of queues that accepted a copy of the message.
    pub queued: usize,
}

/// Why a publish failed.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The payload could not be serialized to JSON.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    /// No bound queue matched the routing key.
    #[error("no queue bound for routing key '{routing_key}' on exchange '{exchange}'")]
    Unroutable {
        /// Exchange the message was published to.
        exchange: String,
        /// Routing key that matched nothing.
        routing_key: String,
    },
}

/// The broker: exchanges, queues, and the wiring between them.
///
/// Constructed once at startup with the full topology declared; shared
/// behind an [`Arc`] afterwards.
pub struct Broker {
    fanout: Arc<Exchange>,
    stat: Arc<Exchange>,
    queues: HashMap<String, Arc<DurableQueue>>,
    dead_letter_routes: HashMap<String, Arc<Exchange>>,
    config: BrokerConfig,
}

impl Broker {
    /// Declare the full topology and return the broker.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        let mut queues = HashMap::new();

        let fanout = Arc::new(Exchange::new(FANOUT_EXCHANGE, ExchangeKind::Fanout));
        for name in NOTIFY_QUEUES {
            let queue = Arc::new(DurableQueue::new(name, None));
            fanout.bind("", Arc::clone(&queue));
            let _ = queues.insert(name.to_owned(), queue);
        }

        let dead_letters = Arc::new(Exchange::new(STAT_DLX, ExchangeKind::Direct));
        let dlq = Arc::new(DurableQueue::new(STAT_DLQ, None));
        dead_letters.bind(STAT_BINDING, Arc::clone(&dlq));
        let _ = queues.insert(STAT_DLQ.to_owned(), dlq);

        let stat = Arc::new(Exchange::new(STAT_EXCHANGE, ExchangeKind::Direct));
        let stat_queue = Arc::new(DurableQueue::new(STAT_QUEUE, Some(config.stat_ttl)));
        stat.bind(STAT_BINDING, Arc::clone(&stat_queue));
        let _ = queues.insert(STAT_QUEUE.to_owned(), stat_queue);

        let mut dead_letter_routes = HashMap::new();
        let _ = dead_letter_routes.insert(STAT_QUEUE.to_owned(), dead_letters);

        Self {
            fanout,
            stat,
            queues,
            dead_letter_routes,
            config,
        }
    }

    /// Consumer failure policy the broker was configured with.
    #[must_use]
    pub fn redelivery(&self) -> RedeliveryPolicy {
        self.config.redelivery
    }

    /// Look up a declared queue by name.
    #[must_use]
    pub fn queue(&self, name: &str) -> Option<Arc<DurableQueue>> {
        self.queues.get(name).map(Arc::clone)
    }

    /// Ready-message count of a declared queue.
    #[must_use]
    pub fn queue_depth(&self, name: &str) -> Option<usize> {
        self.queues.get(name).map(|queue| queue.depth())
    }

    /// Fan an order event out to every notification queue.
    pub fn publish_order(&self, event: &OrderEvent) -> Result<PublishReceipt, PublishError> {
        let payload: Arc<str> = Arc::from(serde_json::to_string(event)?);
        let message = Message {
            routing_key: String::new(),
            payload,
        };
        let queued = self.fanout.publish(&message);
        metrics::counter!(METRIC_BROKER_PUBLISHED, "exchange" => FANOUT_EXCHANGE).increment(1);
        tracing::debug!(kind = %event.kind, queued, "order event fanned out");
        Ok(PublishReceipt { queued })
    }

    /// Publish a statistics record with the given routing key.
    pub fn publish_stat<T: Serialize>(
        &self,
        routing_key: &str,
        record: &T,
    ) -> Result<PublishReceipt, PublishError> {
        let payload: Arc<str> = Arc::from(serde_json::to_string(record)?);
        let message = Message::new(routing_key, payload);
        let queued = self.stat.publish(&message);
        if queued == 0 {
            return Err(PublishError::Unroutable {
                exchange: STAT_EXCHANGE.to_owned(),
                routing_key: routing_key.to_owned(),
            });
        }
        metrics::counter!(METRIC_BROKER_PUBLISHED, "exchange" => STAT_EXCHANGE).increment(1);
        tracing::debug!(routing_key, queued, "stat record published");
        Ok(PublishReceipt { queued })
    }

    /// Route a delivery that left `source_queue` unprocessed to that queue's
    /// dead-letter exchange, keeping its routing key. Returns false when the
    /// queue has no dead-letter route and the message was dropped.
    pub fn dead_letter(&self, source_queue: &str, delivery: &Delivery) -> bool {
        let Some(exchange) = self.dead_letter_routes.get(source_queue) else {
            return false;
        };
        let message = Message {
            routing_key: delivery.routing_key.clone(),
            payload: Arc::clone(&delivery.payload),
        };
        let routed = exchange.publish(&message);
        metrics::counter!(METRIC_BROKER_DEAD_LETTERED, "queue" => source_queue.to_owned())
            .increment(1);
        tracing::warn!(
            queue = source_queue,
            routing_key = %delivery.routing_key,
            tag = delivery.tag,
            "message dead-lettered"
        );
        routed > 0
    }

    /// One sweep over every queue: expired messages are dead-lettered where
    /// a route exists, dropped otherwise. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let mut swept = 0;
        for (name, queue) in &self.queues {
            for delivery in queue.take_expired() {
                metrics::counter!(METRIC_BROKER_EXPIRED, "queue" => name.clone()).increment(1);
                let dead_lettered = self.dead_letter(name, &delivery);
                tracing::debug!(
                    queue = %name,
                    tag = delivery.tag,
                    dead_lettered,
                    "expired message swept"
                );
                swept += 1;
            }
        }
        swept
    }

    /// Periodically sweep expired messages until shutdown.
    pub async fn run_expiry(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.expiry_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let _ = self.sweep_expired();
                }
            }
        }
        tracing::debug!("broker expiry loop stopped");
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
