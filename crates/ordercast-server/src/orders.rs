//! Order lifecycle service: the single write path for orders.
//!
//! Every mutation goes store-first, then publishes a domain event on the
//! in-process bus. Notification fan-out is the dispatchers' job; this
//! service never touches a session registry.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use ordercast_bus::broker::topology::STAT_CREATE_KEY;
use ordercast_bus::{Broker, EventBus};
use ordercast_core::order::generate_order_number;
use ordercast_core::{
    ClientId, Order, OrderDraft, OrderEvent, OrderEventKind, OrderId, OrderStatRecord, OrderStatus,
    OrderStore, StoreError,
};

/// What can go wrong inside the order service.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The referenced order does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order write path over an injected store, bus and broker.
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    bus: EventBus,
    broker: Arc<Broker>,
}

impl OrderService {
    /// Wire the service to its collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, bus: EventBus, broker: Arc<Broker>) -> Self {
        Self { store, bus, broker }
    }

    /// Create an order from a draft and announce it.
    ///
    /// The stat record also goes to the statistics pipeline; a broker
    /// failure there is logged but never fails the creation.
    pub async fn create_order(&self, draft: OrderDraft) -> Result<OrderId, OrderServiceError> {
        let order = Order {
            id: OrderId::new(),
            order_number: generate_order_number(),
            user_id: draft.user_id,
            store_id: draft.store_id,
            amount: draft.amount,
            status: OrderStatus::Created,
            items: draft.items,
            create_time: Utc::now(),
            update_time: None,
        };
        let id = order.id.clone();
        let record = OrderStatRecord::from(&order);
        self.store.put(order.clone()).await?;
        info!(
            order_id = %id,
            order_number = %order.order_number,
            user_id = %order.user_id,
            store_id = %order.store_id,
            "order created"
        );

        let _ = self
            .bus
            .publish(OrderEvent::new(OrderEventKind::OrderCreated, order));
        if let Err(error) = self.broker.publish_stat(STAT_CREATE_KEY, &record) {
            warn!(%error, order_id = %id, "failed to queue order creation stat");
        }
        Ok(id)
    }

    /// Move an order to a new status and announce the transition.
    ///
    /// Publishes `order_paid` when the new status is PAID, `order_updated`
    /// for everything else, with the caller recorded as operator.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
        user_id: &ClientId,
        store_id: &ClientId,
    ) -> Result<(), OrderServiceError> {
        let Some(mut order) = self.store.get(order_id).await? else {
            return Err(OrderServiceError::NotFound(order_id.clone()));
        };
        order.status = new_status;
        order.update_time = Some(Utc::now());
        self.store.put(order.clone()).await?;
        info!(
            order_id = %order_id,
            status = %new_status,
            user_id = %user_id,
            store_id = %store_id,
            "order status updated"
        );

        let kind = if new_status == OrderStatus::Paid {
            OrderEventKind::OrderPaid
        } else {
            OrderEventKind::OrderUpdated
        };
        let event = OrderEvent::new(kind, order)
            .with_operator(store_id.clone())
            .with_description(format!("status changed to {new_status}"));
        let _ = self.bus.publish(event);
        Ok(())
    }

    /// Fetch an order by id.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderServiceError> {
        Ok(self.store.get(order_id).await?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
