//! Order lifecycle events carried by the in-process event bus.
//!
//! Events are a tagged union: every subscriber matches exhaustively on
//! [`OrderEventKind`], so the dispatch table (which kind triggers which
//! notification) is verifiable by inspection. Events are immutable once
//! published and are never persisted; the durable path is the broadcast
//! broker, not the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ClientId;
use crate::order::Order;

/// Kind of order lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    /// A new order was placed.
    OrderCreated,
    /// The order was cancelled.
    OrderCancelled,
    /// The order's status changed (any non-payment transition).
    OrderUpdated,
    /// Payment for the order was confirmed.
    OrderPaid,
    /// The order left the store.
    OrderShipped,
    /// The order was fulfilled.
    OrderCompleted,
    /// Payment was returned.
    OrderRefunded,
}

impl OrderEventKind {
    /// Stable wire code (`order_created`, ...), used as the `type` field of
    /// push envelopes and broadcast payloads.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderCancelled => "order_cancelled",
            Self::OrderUpdated => "order_updated",
            Self::OrderPaid => "order_paid",
            Self::OrderShipped => "order_shipped",
            Self::OrderCompleted => "order_completed",
            Self::OrderRefunded => "order_refunded",
        }
    }

    /// Parse a wire code back into a kind; `None` for unknown codes.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "order_created" => Some(Self::OrderCreated),
            "order_cancelled" => Some(Self::OrderCancelled),
            "order_updated" => Some(Self::OrderUpdated),
            "order_paid" => Some(Self::OrderPaid),
            "order_shipped" => Some(Self::OrderShipped),
            "order_completed" => Some(Self::OrderCompleted),
            "order_refunded" => Some(Self::OrderRefunded),
            _ => None,
        }
    }

    /// Human-readable description for logs.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::OrderCreated => "order created",
            Self::OrderCancelled => "order cancelled",
            Self::OrderUpdated => "order updated",
            Self::OrderPaid => "order paid",
            Self::OrderShipped => "order shipped",
            Self::OrderCompleted => "order completed",
            Self::OrderRefunded => "order refunded",
        }
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable event describing one order mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    /// What happened.
    pub kind: OrderEventKind,
    /// Snapshot of the order after the mutation.
    pub order: Order,
    /// When the event was published.
    pub occurred_at: DateTime<Utc>,
    /// Who performed the operation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<ClientId>,
    /// Free-form operation context, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OrderEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(kind: OrderEventKind, order: Order) -> Self {
        Self {
            kind,
            order,
            occurred_at: Utc::now(),
            operator_id: None,
            description: None,
        }
    }

    /// Attach the acting client.
    #[must_use]
    pub fn with_operator(mut self, operator_id: ClientId) -> Self {
        self.operator_id = Some(operator_id);
        self
    }

    /// Attach an operation description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
