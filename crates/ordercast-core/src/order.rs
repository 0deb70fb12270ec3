//! Order domain model: status lifecycle, line items, and order snapshots.
//!
//! Dispatchers and the broadcast bus only ever see immutable [`Order`]
//! snapshots; the store hands out defensive copies, never references into its
//! own map.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;
use crate::ids::{ClientId, OrderId};

/// Lifecycle status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Order placed, not yet paid.
    Created,
    /// Payment confirmed.
    Paid,
    /// Cancelled before completion.
    Cancelled,
    /// Store is preparing the order.
    Processing,
    /// Fulfilled.
    Completed,
    /// Payment returned after completion or cancellation.
    Refunded,
}

impl OrderStatus {
    /// Stable wire code for this status (`CREATED`, `PAID`, ...).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Parse a status code, case-insensitively.
    ///
    /// The REST surface accepts lowercase query values, so `"paid"` and
    /// `"PAID"` both resolve to [`OrderStatus::Paid`].
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(Self::Created),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "REFUNDED" => Ok(Self::Refunded),
            _ => Err(CoreError::UnknownStatus(s.to_owned())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Single line item on an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product identifier.
    pub product_id: String,
    /// Display name of the product.
    pub product_name: String,
    /// Units ordered.
    pub quantity: u32,
    /// Unit price.
    pub price: f64,
}

/// Full order snapshot as stored, pushed to clients, and broadcast downstream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Server-minted order ID.
    pub id: OrderId,
    /// Human-facing order number (`ORD` + millis + suffix).
    pub order_number: String,
    /// User who placed the order.
    pub user_id: ClientId,
    /// Store fulfilling the order.
    pub store_id: ClientId,
    /// Total amount.
    pub amount: f64,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Line items.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// When the order was created.
    pub create_time: DateTime<Utc>,
    /// When the order was last mutated, absent until the first update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

/// Client-supplied payload for creating an order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// User placing the order.
    pub user_id: ClientId,
    /// Store the order is placed with.
    pub store_id: ClientId,
    /// Total amount.
    pub amount: f64,
    /// Line items.
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Flat order summary published on the statistics pipeline.
///
/// Statistics consumers should not need the full order snapshot, so this
/// carries only the fields they aggregate on.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatRecord {
    /// Order the record describes.
    pub order_id: OrderId,
    /// Human-facing order number.
    pub order_number: String,
    /// User who placed the order.
    pub user_id: ClientId,
    /// Store fulfilling the order.
    pub store_id: ClientId,
    /// Total amount.
    pub amount: f64,
    /// Status at the time the record was published.
    pub status: OrderStatus,
    /// When the order was created.
    pub create_time: DateTime<Utc>,
}

impl From<&Order> for OrderStatRecord {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            user_id: order.user_id.clone(),
            store_id: order.store_id.clone(),
            amount: order.amount,
            status: order.status,
            create_time: order.create_time,
        }
    }
}

/// Generate a human-facing order number: `ORD` + epoch millis + a random
/// suffix in `0..1000`.
#[must_use]
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = rand::rng().random_range(0..1000);
    format!("ORD{millis}{suffix}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft {
            user_id: ClientId::from("u1001"),
            store_id: ClientId::from("s2001"),
            amount: 99.5,
            items: vec![OrderItem {
                product_id: "p1".to_owned(),
                product_name: "coffee".to_owned(),
                quantity: 2,
                price: 49.75,
            }],
        }
    }

    #[test]
    fn status_codes_are_uppercase() {
        assert_eq!(OrderStatus::Created.code(), "CREATED");
        assert_eq!(OrderStatus::Paid.code(), "PAID");
        assert_eq!(OrderStatus::Cancelled.code(), "CANCELLED");
        assert_eq!(OrderStatus::Processing.code(), "PROCESSING");
        assert_eq!(OrderStatus::Completed.code(), "COMPLETED");
        assert_eq!(OrderStatus::Refunded.code(), "REFUNDED");
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(OrderStatus::parse("paid").unwrap(), OrderStatus::Paid);
        assert_eq!(OrderStatus::parse("PAID").unwrap(), OrderStatus::Paid);
        assert_eq!(OrderStatus::parse("Paid").unwrap(), OrderStatus::Paid);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        let err = OrderStatus::parse("SHIPPED-TO-MARS").unwrap_err();
        assert!(err.to_string().contains("SHIPPED-TO-MARS"));
    }

    #[test]
    fn status_serde_uses_code() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let back: OrderStatus = serde_json::from_str("\"REFUNDED\"").unwrap();
        assert_eq!(back, OrderStatus::Refunded);
    }

    #[test]
    fn status_display_matches_code() {
        assert_eq!(format!("{}", OrderStatus::Cancelled), "CANCELLED");
    }

    #[test]
    fn order_serializes_camel_case() {
        let order = Order {
            id: OrderId::from("o1"),
            order_number: "ORD1".to_owned(),
            user_id: ClientId::from("u1"),
            store_id: ClientId::from("s1"),
            amount: 10.0,
            status: OrderStatus::Created,
            items: vec![],
            create_time: Utc::now(),
            update_time: None,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert!(value.get("orderNumber").is_some());
        assert!(value.get("userId").is_some());
        assert!(value.get("storeId").is_some());
        assert!(value.get("createTime").is_some());
        assert!(
            value.get("updateTime").is_none(),
            "unset update time should be omitted"
        );
    }

    #[test]
    fn order_item_round_trips() {
        let item = OrderItem {
            product_id: "p9".to_owned(),
            product_name: "tea".to_owned(),
            quantity: 3,
            price: 5.5,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"productId\""));
        let back: OrderItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn draft_deserializes_with_missing_items() {
        let draft: OrderDraft =
            serde_json::from_str(r#"{"userId":"u1","storeId":"s1","amount":5.0}"#).unwrap();
        assert!(draft.items.is_empty());
        assert_eq!(draft.user_id.as_str(), "u1");
    }

    #[test]
    fn draft_round_trips() {
        let d = draft();
        let json = serde_json::to_string(&d).unwrap();
        let back: OrderDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.store_id, d.store_id);
    }

    #[test]
    fn stat_record_flattens_an_order() {
        let order = Order {
            id: OrderId::from("o7"),
            order_number: "ORD42".to_owned(),
            user_id: ClientId::from("u7"),
            store_id: ClientId::from("s7"),
            amount: 18.25,
            status: OrderStatus::Created,
            items: vec![],
            create_time: Utc::now(),
            update_time: None,
        };
        let record = OrderStatRecord::from(&order);
        assert_eq!(record.order_number, "ORD42");
        assert_eq!(record.status, OrderStatus::Created);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["orderId"], "o7");
        assert!(value.get("items").is_none());
    }

    #[test]
    fn order_number_has_prefix_and_digits() {
        let n = generate_order_number();
        assert!(n.starts_with("ORD"));
        assert!(n.len() > "ORD".len());
        assert!(n["ORD".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn order_numbers_vary() {
        let numbers: std::collections::HashSet<String> =
            (0..20).map(|_| generate_order_number()).collect();
        assert!(numbers.len() > 1, "random suffix should vary");
    }
}
