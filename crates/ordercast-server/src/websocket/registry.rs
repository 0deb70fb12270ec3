//! Concurrent session registry keyed by client identifier.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::{counter, gauge};
use tokio::time::Instant;
use tracing::{debug, warn};

use ordercast_core::{ClientId, ConnectionId};

use super::connection::ClientSession;

/// Registry of live sessions for one endpoint (app users or store terminals).
///
/// Holds the forward map (client id to session) and a reverse index
/// (connection id to client id) so channel teardown can resolve the entry it
/// owns even after the same client re-registered elsewhere. Both maps are
/// sharded concurrent maps; entry-level operations are atomic per key and
/// never serialize unrelated clients.
pub struct SessionRegistry {
    /// Endpoint label for logs and metrics (`"user"` or `"store"`).
    name: &'static str,
    /// After how long without a heartbeat a session counts as expired.
    heartbeat_timeout: Duration,
    sessions: DashMap<ClientId, Arc<ClientSession>>,
    connections: DashMap<ConnectionId, ClientId>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(name: &'static str, heartbeat_timeout: Duration) -> Self {
        Self {
            name,
            heartbeat_timeout,
            sessions: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    /// Endpoint label this registry serves.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a session under its client id, replacing any existing entry.
    ///
    /// Last registration wins. Returns the replaced session (if any) so the
    /// caller can close its channel; the replaced channel's reverse entry is
    /// dropped here so its later teardown cannot evict the new session.
    pub fn register(&self, session: Arc<ClientSession>) -> Option<Arc<ClientSession>> {
        let client_id = session.client_id.clone();
        let connection_id = session.connection_id.clone();
        let _ = self.connections.insert(connection_id.clone(), client_id.clone());
        let replaced = self.sessions.insert(client_id.clone(), session);

        if let Some(old) = &replaced {
            if old.connection_id != connection_id {
                let _ = self
                    .connections
                    .remove_if(&old.connection_id, |_, owner| *owner == client_id);
            }
            debug!(
                registry = self.name,
                client_id = %client_id,
                "registration replaced an existing session"
            );
        }

        counter!("sessions_registered_total", "registry" => self.name).increment(1);
        self.record_active();
        replaced
    }

    /// Refresh the heartbeat for a client.
    ///
    /// Returns `false` (and logs) when no session exists; a heartbeat never
    /// creates an entry.
    pub fn heartbeat(&self, client_id: &ClientId) -> bool {
        match self.sessions.get(client_id) {
            Some(session) => {
                session.touch();
                counter!("heartbeats_total", "registry" => self.name).increment(1);
                true
            }
            None => {
                warn!(
                    registry = self.name,
                    client_id = %client_id,
                    "heartbeat for unknown client ignored"
                );
                false
            }
        }
    }

    /// Look up the session for a client id.
    #[must_use]
    pub fn lookup(&self, client_id: &ClientId) -> Option<Arc<ClientSession>> {
        self.sessions.get(client_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove the session for a client id and return it.
    ///
    /// Idempotent; the caller decides whether to close the returned channel.
    pub fn remove(&self, client_id: &ClientId) -> Option<Arc<ClientSession>> {
        let removed = self.sessions.remove(client_id).map(|(_, session)| session);
        if let Some(session) = &removed {
            let _ = self
                .connections
                .remove_if(&session.connection_id, |_, owner| owner == client_id);
            self.record_active();
        }
        removed
    }

    /// Remove the session owned by a physical channel.
    ///
    /// Resolves the client id through the reverse index and removes the
    /// forward entry only if it still belongs to this connection, so a newer
    /// registration for the same client survives its predecessor's teardown.
    pub fn remove_by_connection(&self, connection_id: &ConnectionId) -> Option<Arc<ClientSession>> {
        let (_, client_id) = self.connections.remove(connection_id)?;
        let removed = self
            .sessions
            .remove_if(&client_id, |_, session| session.connection_id == *connection_id)
            .map(|(_, session)| session);
        if removed.is_some() {
            self.record_active();
        }
        removed
    }

    /// Whether a client has a live session: present, channel open, and
    /// heartbeat within the timeout window.
    #[must_use]
    pub fn is_live(&self, client_id: &ClientId) -> bool {
        let now = Instant::now();
        self.sessions.get(client_id).is_some_and(|session| {
            session.is_open() && !session.is_expired(self.heartbeat_timeout, now)
        })
    }

    /// Best-effort push of a text payload to a client's live channel.
    ///
    /// Returns `false` when the client has no open session or the send was
    /// dropped; failures are logged, never raised.
    pub fn push(&self, client_id: &ClientId, payload: Arc<String>) -> bool {
        let Some(session) = self.lookup(client_id) else {
            debug!(registry = self.name, client_id = %client_id, "push skipped, client offline");
            return false;
        };
        if !session.is_open() {
            debug!(registry = self.name, client_id = %client_id, "push skipped, channel closed");
            return false;
        }
        if session.send(payload) {
            counter!("session_pushes_total", "registry" => self.name).increment(1);
            true
        } else {
            counter!("session_push_drops_total", "registry" => self.name).increment(1);
            warn!(
                registry = self.name,
                client_id = %client_id,
                dropped = session.drop_count(),
                "push dropped, send queue full or channel gone"
            );
            false
        }
    }

    /// Evict every session that is closed or whose heartbeat expired,
    /// closing each evicted channel. Returns the number removed.
    ///
    /// Safe to run concurrently with register/heartbeat/lookup: each removal
    /// re-checks the condition under the entry lock, so a session refreshed
    /// or replaced mid-sweep is left alone.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let timeout = self.heartbeat_timeout;
        let candidates: Vec<ClientId> = self
            .sessions
            .iter()
            .filter(|entry| {
                let session = entry.value();
                !session.is_open() || session.is_expired(timeout, now)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for client_id in candidates {
            let evicted = self.sessions.remove_if(&client_id, |_, session| {
                !session.is_open() || session.is_expired(timeout, now)
            });
            if let Some((_, session)) = evicted {
                let _ = self
                    .connections
                    .remove_if(&session.connection_id, |_, owner| *owner == client_id);
                let _ = session.close();
                debug!(
                    registry = self.name,
                    client_id = %client_id,
                    idle = ?session.since_heartbeat(now),
                    "expired session evicted"
                );
                removed += 1;
            }
        }

        if removed > 0 {
            counter!("sessions_swept_total", "registry" => self.name).increment(removed as u64);
            self.record_active();
        }
        removed
    }

    /// Client ids with a current session, in no particular order.
    #[must_use]
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_active(&self) {
        gauge!("sessions_active", "registry" => self.name).set(self.sessions.len() as f64);
    }
}
