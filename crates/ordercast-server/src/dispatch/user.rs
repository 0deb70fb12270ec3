//! User dispatcher: tells buyers when their order changes.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ordercast_core::{OrderEvent, OrderEventKind};

use crate::websocket::protocol::OrderPush;
use crate::websocket::registry::SessionRegistry;

/// Push an `order_updated` notification to the buyer who owns the order.
///
/// Creation is the store's concern and payment has its own dispatcher, so
/// every other kind is a no-op here.
pub async fn run_user_dispatcher(
    rx: broadcast::Receiver<OrderEvent>,
    users: Arc<SessionRegistry>,
    shutdown: CancellationToken,
) {
    super::run_dispatcher("user_dispatcher", rx, shutdown, move |event| {
        match event.kind {
            OrderEventKind::OrderUpdated => {
                let push = OrderPush::from_event(
                    event,
                    format!("Your order {} has been updated", event.order.order_number),
                );
                if !super::push_envelope(&users, &event.order.user_id, &push) {
                    debug!(
                        user_id = %event.order.user_id,
                        order_id = %event.order.id,
                        "user offline, update notification dropped"
                    );
                }
            }
            OrderEventKind::OrderCreated
            | OrderEventKind::OrderCancelled
            | OrderEventKind::OrderPaid
            | OrderEventKind::OrderShipped
            | OrderEventKind::OrderCompleted
            | OrderEventKind::OrderRefunded => {}
        }
    })
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
