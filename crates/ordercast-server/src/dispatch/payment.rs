//! Payment dispatcher: confirms payment to both parties and fans the paid
//! order out to downstream services through the durable broker.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ordercast_bus::Broker;
use ordercast_core::{OrderEvent, OrderEventKind};

use crate::websocket::protocol::OrderPush;
use crate::websocket::registry::SessionRegistry;

/// On `order_paid`: push the same confirmation to the buyer and the store,
/// then publish the event to the fanout exchange exactly once.
///
/// The three legs are independent; an offline client or a broker error is
/// logged and never blocks the other legs.
pub async fn run_payment_dispatcher(
    rx: broadcast::Receiver<OrderEvent>,
    users: Arc<SessionRegistry>,
    stores: Arc<SessionRegistry>,
    broker: Arc<Broker>,
    shutdown: CancellationToken,
) {
    super::run_dispatcher("payment_dispatcher", rx, shutdown, move |event| {
        match event.kind {
            OrderEventKind::OrderPaid => {
                let push = OrderPush::from_event(
                    event,
                    format!("Payment received for order {}", event.order.order_number),
                );
                let user_sent = super::push_envelope(&users, &event.order.user_id, &push);
                let store_sent = super::push_envelope(&stores, &event.order.store_id, &push);
                match broker.publish_order(event) {
                    Ok(receipt) => debug!(
                        order_id = %event.order.id,
                        queued = receipt.queued,
                        user_sent,
                        store_sent,
                        "payment notifications dispatched"
                    ),
                    Err(error) => warn!(
                        %error,
                        order_id = %event.order.id,
                        "failed to fan paid order out to broker"
                    ),
                }
            }
            OrderEventKind::OrderCreated
            | OrderEventKind::OrderCancelled
            | OrderEventKind::OrderUpdated
            | OrderEventKind::OrderShipped
            | OrderEventKind::OrderCompleted
            | OrderEventKind::OrderRefunded => {}
        }
    })
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
