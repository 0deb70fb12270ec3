//! WebSocket channel lifecycle — one task per connected client, from upgrade
//! through teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ordercast_core::ConnectionId;

use super::connection::ClientSession;
use super::protocol::{self, Inbound};
use super::registry::SessionRegistry;

/// Run a WebSocket channel for one client.
///
/// 1. Splits the socket and spawns an outbound forwarder over a bounded queue
/// 2. Answers protocol frames; a `connect` registers the channel, later
///    frames refresh heartbeats or get error envelopes
/// 3. Exits when the peer closes, the socket errors, or the registry closes
///    the session (sweep eviction or a replacing registration)
/// 4. Tears the registry entry down through the connection-id index
#[instrument(skip_all, fields(endpoint = registry.name(), connection = %connection_id))]
pub async fn run_channel(
    socket: WebSocket,
    connection_id: ConnectionId,
    registry: Arc<SessionRegistry>,
    send_queue_size: usize,
    open_channels: Arc<AtomicUsize>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(send_queue_size);

    let started = std::time::Instant::now();
    let _ = open_channels.fetch_add(1, Ordering::Relaxed);
    info!("channel open");
    counter!("ws_connections_total", "endpoint" => registry.name()).increment(1);
    gauge!("ws_connections_active").increment(1.0);

    // Outbound forwarder: drains the send queue into the socket.
    let outbound = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                break;
            }
        }
    });

    // Set after a successful connect; a registry-side close of the current
    // session ends this task.
    let mut session_closed: Option<CancellationToken> = None;
    let mut registered: Option<ordercast_core::ClientId> = None;

    loop {
        let closed = async {
            match &session_closed {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let frame = tokio::select! {
            () = closed => {
                info!("session closed by registry, dropping channel");
                break;
            }
            frame = ws_rx.next() => frame,
        };

        let Some(Ok(msg)) = frame else {
            break;
        };

        let text = match msg {
            Message::Text(ref t) => t.to_string(),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => s.to_owned(),
                Err(_) => {
                    debug!(len = data.len(), "non-UTF8 binary frame ignored");
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match protocol::parse_inbound(&text) {
            Inbound::Connect {
                client_id: Some(client_id),
            } => {
                // A channel that re-identifies under a new id gives up its
                // previous registration. Resolving through the connection
                // index cannot touch a session another channel now owns.
                if let Some(prev) = registered.replace(client_id.clone()) {
                    if prev != client_id {
                        if let Some(stale) = registry.remove_by_connection(&connection_id) {
                            let _ = stale.close();
                        }
                    }
                }
                let session = Arc::new(ClientSession::new(
                    client_id.clone(),
                    connection_id.clone(),
                    send_tx.clone(),
                ));
                let signal = session.close_signal();
                if let Some(old) = registry.register(session) {
                    // Kick whatever held this identifier before; closing our
                    // own superseded registration is a harmless no-op.
                    let _ = old.close();
                }
                session_closed = Some(signal);
                info!(client_id = %client_id, "client registered");
                enqueue(&send_tx, protocol::connection_success(&client_id));
            }
            Inbound::Connect { client_id: None } => {
                warn!("connect frame without clientId");
                enqueue(&send_tx, protocol::missing_client_id_error());
            }
            Inbound::Ping { client_id } => {
                if let Some(client_id) = &client_id {
                    let _ = registry.heartbeat(client_id);
                }
                enqueue(&send_tx, protocol::pong());
            }
            Inbound::Unknown { kind } => {
                debug!(kind, "unrecognized message type");
                enqueue(&send_tx, protocol::unknown_type_error(&kind));
            }
            Inbound::MissingType => {
                enqueue(&send_tx, protocol::missing_type_error());
            }
            Inbound::Malformed => {
                debug!(len = text.len(), "unparseable frame");
                enqueue(&send_tx, protocol::process_failure_error());
            }
        }
    }

    info!("channel closed");
    counter!("ws_disconnections_total", "endpoint" => registry.name()).increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds").record(started.elapsed().as_secs_f64());
    outbound.abort();
    if let Some(session) = registry.remove_by_connection(&connection_id) {
        let _ = session.close();
        debug!(client_id = %session.client_id, "session deregistered");
    }
    let _ = open_channels.fetch_sub(1, Ordering::Relaxed);
}

/// Queue a protocol reply; replies ride the same bounded queue as pushes.
fn enqueue(tx: &mpsc::Sender<Arc<String>>, reply: String) {
    if tx.try_send(Arc::new(reply)).is_err() {
        debug!("reply dropped, send queue full or closed");
    }
}

#[cfg(test)]
mod tests {
    // Channel tasks need real sockets and are exercised end to end in
    // tests/integration.rs. The reply queue helper is covered here.

    use super::*;

    #[tokio::test]
    async fn enqueue_delivers_to_the_forwarder_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        enqueue(&tx, protocol::pong());
        let queued = rx.recv().await.unwrap();
        assert!(queued.contains("pong"));
    }

    #[tokio::test]
    async fn enqueue_on_full_queue_drops_silently() {
        let (tx, _rx) = mpsc::channel(1);
        enqueue(&tx, "first".to_owned());
        enqueue(&tx, "second".to_owned());
    }
}
