//! Live channel state for a registered client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ordercast_core::{ClientId, ConnectionId};

/// One registered session: a client identifier bound to a live channel.
///
/// Created when a channel identifies itself with a `connect` message and
/// owned by the registry from then on. The channel task and the sweeper may
/// both close a session concurrently; `close` is idempotent.
pub struct ClientSession {
    /// Identifier the client registered under.
    pub client_id: ClientId,
    /// Physical channel this session is bound to.
    pub connection_id: ConnectionId,
    /// Send half of the channel's outbound queue.
    tx: mpsc::Sender<Arc<String>>,
    /// When the session was registered.
    pub registered_at: Instant,
    /// Last heartbeat receipt, refreshed by `ping` messages.
    last_heartbeat: Mutex<Instant>,
    /// Set once the session has been closed.
    closed: AtomicBool,
    /// Cancelled on close so the owning channel task can tear down.
    cancel: CancellationToken,
    /// Count of messages dropped due to a full send queue.
    pub dropped_messages: AtomicU64,
}

impl ClientSession {
    /// Create a session for a freshly identified channel.
    pub fn new(
        client_id: ClientId,
        connection_id: ConnectionId,
        tx: mpsc::Sender<Arc<String>>,
    ) -> Self {
        let now = Instant::now();
        Self {
            client_id,
            connection_id,
            tx,
            registered_at: now,
            last_heartbeat: Mutex::new(now),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Enqueue a text payload for the client.
    ///
    /// Returns `false` if the session is closed or the queue is full; a full
    /// queue increments the dropped counter. Never blocks.
    pub fn send(&self, payload: Arc<String>) -> bool {
        if self.closed.load(Ordering::Relaxed) {
            return false;
        }
        if self.tx.try_send(payload).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize a JSON value and enqueue it.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Record a heartbeat now.
    pub fn touch(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    /// Time since the last heartbeat.
    pub fn since_heartbeat(&self, now: Instant) -> Duration {
        now.duration_since(*self.last_heartbeat.lock())
    }

    /// Whether the heartbeat window has lapsed.
    pub fn is_expired(&self, timeout: Duration, now: Instant) -> bool {
        self.since_heartbeat(now) > timeout
    }

    /// Whether the session can still accept sends.
    ///
    /// False once closed, and also once the channel task has gone away and
    /// dropped the receive half of the queue.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Relaxed) && !self.tx.is_closed()
    }

    /// Close the session. Idempotent; returns `true` on the first close.
    ///
    /// Cancels the close signal so the owning channel task exits and drops
    /// the socket.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::Relaxed);
        if first {
            self.cancel.cancel();
        }
        first
    }

    /// Token cancelled when the session is closed. The channel task selects
    /// on this to tear down the socket after a registry-side close.
    pub fn close_signal(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Total messages dropped for this session.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}
