//! Durable in-process queue with acknowledgements and per-message TTL.
//!
//! A queue survives the disconnect of every consumer: messages stay in the
//! ready buffer until something pops them, and popped messages are held
//! in-flight until they are acked or nacked. Queues declared with a TTL hand
//! their expired messages to [`DurableQueue::take_expired`] so the broker can
//! dead-letter them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::delivery::{Delivery, Message};

/// Gauge: number of ready messages per queue.
pub const METRIC_QUEUE_DEPTH: &str = "broker_queue_depth";

#[derive(Default)]
struct QueueInner {
    ready: VecDeque<Delivery>,
    in_flight: HashMap<u64, Delivery>,
    /// Expired messages pulled off the ready buffer by `try_pop`, parked here
    /// until the expiry sweep collects them.
    expired: Vec<Delivery>,
}

/// A named queue that buffers messages independently of its consumers.
pub struct DurableQueue {
    name: String,
    ttl: Option<Duration>,
    next_tag: AtomicU64,
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl DurableQueue {
    /// Declare a queue. `ttl` bounds how long a message may wait unconsumed.
    #[must_use]
    pub fn new(name: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            ttl,
            next_tag: AtomicU64::new(1),
            inner: Mutex::new(QueueInner::default()),
            notify: Notify::new(),
        }
    }

    /// Queue name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Message TTL, if the queue was declared with one.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Enqueue a message and wake one waiting consumer. Returns the delivery
    /// tag assigned to it.
    pub fn push(&self, message: &Message) -> u64 {
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let delivery = Delivery {
            tag,
            routing_key: message.routing_key.clone(),
            payload: Arc::clone(&message.payload),
            published_at: now,
            expires_at: self.ttl.map(|ttl| now + ttl),
            redelivered: false,
        };
        let depth = {
            let mut inner = self.inner.lock();
            inner.ready.push_back(delivery);
            inner.ready.len()
        };
        self.record_depth(depth);
        self.notify.notify_one();
        tag
    }

    /// Pop the oldest ready message without waiting. Expired messages at the
    /// head are skipped and parked for the expiry sweep.
    pub fn try_pop(&self) -> Option<Delivery> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        while let Some(delivery) = inner.ready.pop_front() {
            if delivery.is_expired(now) {
                inner.expired.push(delivery);
                continue;
            }
            let handed_out = delivery.clone();
            let _ = inner.in_flight.insert(delivery.tag, delivery);
            let depth = inner.ready.len();
            drop(inner);
            self.record_depth(depth);
            return Some(handed_out);
        }
        None
    }

    /// Pop the oldest ready message, waiting for one to arrive if the queue
    /// is empty.
    pub async fn pop(&self) -> Delivery {
        loop {
            if let Some(delivery) = self.try_pop() {
                return delivery;
            }
            // notify_one stores a permit when nobody is waiting yet, so a
            // push racing this await is never lost.
            self.notify.notified().await;
        }
    }

    /// Acknowledge an in-flight delivery. Returns false for unknown tags.
    pub fn ack(&self, tag: u64) -> bool {
        self.inner.lock().in_flight.remove(&tag).is_some()
    }

    /// Reject an in-flight delivery.
    ///
    /// With `requeue` the message goes back to the head of the ready buffer,
    /// marked redelivered, and `None` is returned. Without it the message
    /// leaves the queue and is handed back so the caller can dead-letter or
    /// drop it.
    pub fn nack(&self, tag: u64, requeue: bool) -> Option<Delivery> {
        let mut inner = self.inner.lock();
        let mut delivery = inner.in_flight.remove(&tag)?;
        if requeue {
            delivery.redelivered = true;
            inner.ready.push_front(delivery);
            let depth = inner.ready.len();
            drop(inner);
            self.record_depth(depth);
            self.notify.notify_one();
            None
        } else {
            Some(delivery)
        }
    }

    /// Remove and return every ready message whose TTL has passed.
    pub fn take_expired(&self) -> Vec<Delivery> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let mut expired = std::mem::take(&mut inner.expired);
        let mut index = 0;
        while index < inner.ready.len() {
            if inner.ready[index].is_expired(now) {
                if let Some(delivery) = inner.ready.remove(index) {
                    expired.push(delivery);
                }
            } else {
                index += 1;
            }
        }
        let depth = inner.ready.len();
        drop(inner);
        if !expired.is_empty() {
            self.record_depth(depth);
        }
        expired
    }

    /// Number of ready messages.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.lock().ready.len()
    }

    /// Number of delivered-but-unacked messages.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_depth(&self, depth: usize) {
        metrics::gauge!(METRIC_QUEUE_DEPTH, "queue" => self.name.clone()).set(depth as f64);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
