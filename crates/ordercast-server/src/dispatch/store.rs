//! Store dispatcher: alerts merchants when a new order lands.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ordercast_core::{OrderEvent, OrderEventKind};

use crate::websocket::protocol::OrderPush;
use crate::websocket::registry::SessionRegistry;

/// Push an `order_created` notification to the store the order was placed
/// with, so the merchant can start processing right away.
pub async fn run_store_dispatcher(
    rx: broadcast::Receiver<OrderEvent>,
    stores: Arc<SessionRegistry>,
    shutdown: CancellationToken,
) {
    super::run_dispatcher("store_dispatcher", rx, shutdown, move |event| {
        match event.kind {
            OrderEventKind::OrderCreated => {
                let push = OrderPush::from_event(event, "New order received, please process");
                if !super::push_envelope(&stores, &event.order.store_id, &push) {
                    debug!(
                        store_id = %event.order.store_id,
                        order_id = %event.order.id,
                        "store offline, new-order notification dropped"
                    );
                }
            }
            OrderEventKind::OrderCancelled
            | OrderEventKind::OrderUpdated
            | OrderEventKind::OrderPaid
            | OrderEventKind::OrderShipped
            | OrderEventKind::OrderCompleted
            | OrderEventKind::OrderRefunded => {}
        }
    })
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
