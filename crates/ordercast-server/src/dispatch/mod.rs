//! Notification dispatchers — one independent task per recipient class.
//!
//! Each dispatcher subscribes to the event bus and matches exhaustively on
//! the event kind, so the routing table (which kind triggers which push) is
//! visible in each dispatcher's match arms. Dispatchers are failure
//! isolated: everything fallible inside a dispatcher is logged and
//! swallowed, and a stalled or failed dispatcher never affects its siblings
//! or the publisher.

pub mod payment;
pub mod store;
pub mod user;

pub use payment::run_payment_dispatcher;
pub use store::run_store_dispatcher;
pub use user::run_user_dispatcher;

use std::sync::Arc;

use metrics::counter;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ordercast_bus::{Broker, EventBus};
use ordercast_core::{ClientId, OrderEvent};

use crate::websocket::protocol::OrderPush;
use crate::websocket::registry::SessionRegistry;

/// Subscribe and spawn all three dispatchers, returning named handles for
/// the shutdown coordinator.
///
/// Each gets its own bus receiver, so a slow dispatcher lags alone.
pub fn spawn_dispatchers(
    bus: &EventBus,
    users: Arc<SessionRegistry>,
    stores: Arc<SessionRegistry>,
    broker: Arc<Broker>,
    shutdown: &CancellationToken,
) -> Vec<(&'static str, JoinHandle<()>)> {
    vec![
        (
            "user_dispatcher",
            tokio::spawn(run_user_dispatcher(
                bus.subscribe(),
                Arc::clone(&users),
                shutdown.clone(),
            )),
        ),
        (
            "store_dispatcher",
            tokio::spawn(run_store_dispatcher(
                bus.subscribe(),
                Arc::clone(&stores),
                shutdown.clone(),
            )),
        ),
        (
            "payment_dispatcher",
            tokio::spawn(run_payment_dispatcher(
                bus.subscribe(),
                users,
                stores,
                broker,
                shutdown.clone(),
            )),
        ),
    ]
}

/// Shared receive loop: hand each event to the dispatcher's handler until
/// the bus closes or shutdown is signalled.
#[instrument(skip_all, fields(dispatcher = name))]
async fn run_dispatcher(
    name: &'static str,
    mut rx: broadcast::Receiver<OrderEvent>,
    shutdown: CancellationToken,
    mut handle: impl FnMut(&OrderEvent),
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            result = rx.recv() => match result {
                Ok(event) => {
                    counter!("dispatcher_events_total", "dispatcher" => name).increment(1);
                    handle(&event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(dispatcher = name, lagged = n, "dispatcher lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!(dispatcher = name, "event bus closed, dispatcher exiting");
                    break;
                }
            }
        }
    }
    debug!(dispatcher = name, "dispatcher stopped");
}

/// Serialize a push envelope once and hand it to the registry.
///
/// Failures never leave this function; a false return only means the client
/// missed this one notification.
fn push_envelope(registry: &SessionRegistry, client_id: &ClientId, push: &OrderPush) -> bool {
    match serde_json::to_string(push) {
        Ok(json) => registry.push(client_id, Arc::new(json)),
        Err(error) => {
            warn!(%error, client_id = %client_id, "failed to serialize push envelope");
            false
        }
    }
}
