//! Queue consumers for the broadcast topology.
//!
//! Three copies of every order notification sit on the fan-out queues; the
//! statistics pipeline carries flat [`OrderStatRecord`] summaries. Each
//! consumer runs as its own task, popping deliveries until shutdown and
//! acking what it processed. A delivery that fails to parse is handled per
//! the broker's [`RedeliveryPolicy`], with the guard that a message is
//! requeued at most once.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ordercast_core::{OrderEvent, OrderStatRecord};

use crate::broker::queue::DurableQueue;
use crate::broker::topology::{STAT_DLQ, STAT_QUEUE};
use crate::broker::{Broker, Delivery, RedeliveryPolicy};

/// Counter: deliveries acknowledged, labelled by queue.
pub const METRIC_BROKER_CONSUMED: &str = "broker_messages_consumed_total";

/// Counter: deliveries a consumer could not process, labelled by queue.
pub const METRIC_BROKER_REJECTED: &str = "broker_messages_rejected_total";

/// Consume one fan-out notification queue, logging each order event.
///
/// `queue_name` must be one of the queues bound to the fan-out exchange.
pub async fn run_notify_consumer(
    broker: Arc<Broker>,
    queue_name: &'static str,
    shutdown: CancellationToken,
) {
    let Some(queue) = broker.queue(queue_name) else {
        tracing::error!(queue = queue_name, "consumer started for undeclared queue");
        return;
    };
    tracing::debug!(queue = queue_name, "notify consumer started");
    loop {
        let delivery = tokio::select! {
            () = shutdown.cancelled() => break,
            delivery = queue.pop() => delivery,
        };
        match serde_json::from_str::<OrderEvent>(&delivery.payload) {
            Ok(event) => {
                ack(&queue, queue_name, delivery.tag);
                tracing::info!(
                    queue = queue_name,
                    kind = %event.kind,
                    order_number = %event.order.order_number,
                    status = %event.order.status,
                    "order notification consumed"
                );
            }
            Err(error) => reject(&broker, &queue, queue_name, delivery, &error),
        }
    }
    tracing::debug!(queue = queue_name, "notify consumer stopped");
}

/// Consume the statistics queue.
pub async fn run_stat_consumer(broker: Arc<Broker>, shutdown: CancellationToken) {
    let Some(queue) = broker.queue(STAT_QUEUE) else {
        tracing::error!(queue = STAT_QUEUE, "consumer started for undeclared queue");
        return;
    };
    tracing::debug!(queue = STAT_QUEUE, "stat consumer started");
    loop {
        let delivery = tokio::select! {
            () = shutdown.cancelled() => break,
            delivery = queue.pop() => delivery,
        };
        match serde_json::from_str::<OrderStatRecord>(&delivery.payload) {
            Ok(record) => {
                ack(&queue, STAT_QUEUE, delivery.tag);
                tracing::info!(
                    routing_key = %delivery.routing_key,
                    order_number = %record.order_number,
                    amount = record.amount,
                    "stat record consumed"
                );
            }
            Err(error) => reject(&broker, &queue, STAT_QUEUE, delivery, &error),
        }
    }
    tracing::debug!(queue = STAT_QUEUE, "stat consumer stopped");
}

/// Drain the dead-letter queue, logging every message that landed there.
///
/// Dead letters are always acked; this inspector exists so expired
/// statistics are visible in the logs rather than silently discarded.
pub async fn run_dead_letter_inspector(broker: Arc<Broker>, shutdown: CancellationToken) {
    let Some(queue) = broker.queue(STAT_DLQ) else {
        tracing::error!(queue = STAT_DLQ, "inspector started for undeclared queue");
        return;
    };
    tracing::debug!(queue = STAT_DLQ, "dead letter inspector started");
    loop {
        let delivery = tokio::select! {
            () = shutdown.cancelled() => break,
            delivery = queue.pop() => delivery,
        };
        ack(&queue, STAT_DLQ, delivery.tag);
        match serde_json::from_str::<OrderStatRecord>(&delivery.payload) {
            Ok(record) => tracing::warn!(
                routing_key = %delivery.routing_key,
                order_number = %record.order_number,
                "stat record expired unconsumed"
            ),
            Err(_) => tracing::warn!(
                routing_key = %delivery.routing_key,
                bytes = delivery.payload.len(),
                "unparseable dead letter"
            ),
        }
    }
    tracing::debug!(queue = STAT_DLQ, "dead letter inspector stopped");
}

fn ack(queue: &DurableQueue, queue_name: &'static str, tag: u64) {
    let _ = queue.ack(tag);
    metrics::counter!(METRIC_BROKER_CONSUMED, "queue" => queue_name).increment(1);
}

/// Apply the redelivery policy to a failed delivery. Under `Requeue`, a
/// delivery already marked redelivered is not requeued again; it leaves the
/// queue like under `Drop` so a poison message cannot loop forever.
fn reject(
    broker: &Broker,
    queue: &DurableQueue,
    queue_name: &'static str,
    delivery: Delivery,
    error: &serde_json::Error,
) {
    metrics::counter!(METRIC_BROKER_REJECTED, "queue" => queue_name).increment(1);
    tracing::warn!(
        queue = queue_name,
        tag = delivery.tag,
        redelivered = delivery.redelivered,
        %error,
        "failed to process delivery"
    );
    let retry = broker.redelivery() == RedeliveryPolicy::Requeue && !delivery.redelivered;
    if retry {
        let _ = queue.nack(delivery.tag, true);
    } else if let Some(rejected) = queue.nack(delivery.tag, false) {
        let _ = broker.dead_letter(queue_name, &rejected);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
