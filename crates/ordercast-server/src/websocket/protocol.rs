//! JSON text-frame protocol shared by the app and store endpoints.
//!
//! Inbound frames are objects with a `type` field (`connect`, `ping`) and an
//! optional `clientId`. Every malformed or unrecognized frame gets an error
//! envelope back; the channel itself always stays open.

use serde::{Deserialize, Serialize};

use ordercast_core::{ClientId, OrderEvent, OrderId};

/// Parsed inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// `{"type":"connect","clientId":...}` — register this channel.
    Connect {
        /// Identifier to register under, when supplied.
        client_id: Option<ClientId>,
    },
    /// `{"type":"ping","clientId":...}` — liveness probe.
    Ping {
        /// Identifier whose heartbeat to refresh, when supplied.
        client_id: Option<ClientId>,
    },
    /// Well-formed frame with an unrecognized `type` value.
    Unknown {
        /// The offending type string.
        kind: String,
    },
    /// Valid JSON without a string `type` field.
    MissingType,
    /// Not parseable as JSON at all.
    Malformed,
}

/// Parse one inbound text frame.
#[must_use]
pub fn parse_inbound(text: &str) -> Inbound {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Inbound::Malformed;
    };
    let Some(kind) = value.get("type").and_then(|v| v.as_str()) else {
        return Inbound::MissingType;
    };
    let client_id = value
        .get("clientId")
        .and_then(|v| v.as_str())
        .map(ClientId::from);
    match kind {
        "connect" => Inbound::Connect { client_id },
        "ping" => Inbound::Ping { client_id },
        other => Inbound::Unknown {
            kind: other.to_owned(),
        },
    }
}

/// Acknowledgment for a successful registration.
#[must_use]
pub fn connection_success(client_id: &ClientId) -> String {
    serde_json::json!({
        "type": "connection_success",
        "message": "Connected successfully",
        "clientId": client_id,
    })
    .to_string()
}

/// Reply to a `ping`.
#[must_use]
pub fn pong() -> String {
    serde_json::json!({"type": "pong"}).to_string()
}

/// Error envelope for a frame without a `type` field.
#[must_use]
pub fn missing_type_error() -> String {
    error_envelope("Missing 'type' field in message")
}

/// Error envelope for a `connect` without a `clientId`.
#[must_use]
pub fn missing_client_id_error() -> String {
    error_envelope("Missing 'clientId' field in connect message")
}

/// Error envelope naming an unrecognized `type` value.
#[must_use]
pub fn unknown_type_error(kind: &str) -> String {
    error_envelope(&format!("Unknown message type: {kind}"))
}

/// Error envelope for a frame that could not be parsed.
#[must_use]
pub fn process_failure_error() -> String {
    error_envelope("Failed to process message")
}

fn error_envelope(message: &str) -> String {
    serde_json::json!({"type": "error", "message": message}).to_string()
}

/// Server-to-client push notifying one order lifecycle change.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPush {
    /// Event wire code (`order_created`, `order_paid`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Order the notification is about.
    pub order_id: OrderId,
    /// Human-facing order number.
    pub order_number: String,
    /// Human-readable notification text.
    pub message: String,
    /// Current order status code.
    pub status: String,
    /// Event time in epoch milliseconds.
    pub timestamp: i64,
}

impl OrderPush {
    /// Build a push envelope from an order event.
    #[must_use]
    pub fn from_event(event: &OrderEvent, message: impl Into<String>) -> Self {
        Self {
            kind: event.kind.code().to_owned(),
            order_id: event.order.id.clone(),
            order_number: event.order.order_number.clone(),
            message: message.into(),
            status: event.order.status.code().to_owned(),
            timestamp: event.occurred_at.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ordercast_core::{Order, OrderEventKind, OrderStatus};

    #[test]
    fn parse_connect_with_client_id() {
        let inbound = parse_inbound(r#"{"type":"connect","clientId":"u1001"}"#);
        assert_eq!(
            inbound,
            Inbound::Connect {
                client_id: Some(ClientId::from("u1001"))
            }
        );
    }

    #[test]
    fn parse_connect_without_client_id() {
        let inbound = parse_inbound(r#"{"type":"connect"}"#);
        assert_eq!(inbound, Inbound::Connect { client_id: None });
    }

    #[test]
    fn parse_ping_with_and_without_client_id() {
        assert_eq!(
            parse_inbound(r#"{"type":"ping","clientId":"s2001"}"#),
            Inbound::Ping {
                client_id: Some(ClientId::from("s2001"))
            }
        );
        assert_eq!(parse_inbound(r#"{"type":"ping"}"#), Inbound::Ping { client_id: None });
    }

    #[test]
    fn parse_unknown_type_keeps_the_offender() {
        let inbound = parse_inbound(r#"{"type":"subscribe"}"#);
        assert_eq!(
            inbound,
            Inbound::Unknown {
                kind: "subscribe".to_owned()
            }
        );
    }

    #[test]
    fn parse_missing_type() {
        assert_eq!(parse_inbound(r#"{"clientId":"u1"}"#), Inbound::MissingType);
        // Valid JSON that is not an object also has no type field.
        assert_eq!(parse_inbound("42"), Inbound::MissingType);
        // A non-string type value counts as missing.
        assert_eq!(parse_inbound(r#"{"type":5}"#), Inbound::MissingType);
    }

    #[test]
    fn parse_malformed_frame() {
        assert_eq!(parse_inbound("not json at all"), Inbound::Malformed);
        assert_eq!(parse_inbound(r#"{"type":"#), Inbound::Malformed);
    }

    #[test]
    fn connection_success_embeds_the_client_id() {
        let reply = connection_success(&ClientId::from("u1001"));
        let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(parsed["type"], "connection_success");
        assert_eq!(parsed["message"], "Connected successfully");
        assert_eq!(parsed["clientId"], "u1001");
    }

    #[test]
    fn pong_reply_shape() {
        let parsed: serde_json::Value = serde_json::from_str(&pong()).unwrap();
        assert_eq!(parsed, serde_json::json!({"type": "pong"}));
    }

    #[test]
    fn error_replies_use_the_documented_messages() {
        let cases = [
            (missing_type_error(), "Missing 'type' field in message"),
            (
                missing_client_id_error(),
                "Missing 'clientId' field in connect message",
            ),
            (unknown_type_error("subscribe"), "Unknown message type: subscribe"),
            (process_failure_error(), "Failed to process message"),
        ];
        for (reply, expected) in cases {
            let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
            assert_eq!(parsed["type"], "error");
            assert_eq!(parsed["message"], expected);
        }
    }

    #[test]
    fn order_push_carries_the_event_facts() {
        let order = Order {
            id: OrderId::from("o1"),
            order_number: "ORD7".to_owned(),
            user_id: ClientId::from("u1"),
            store_id: ClientId::from("s1"),
            amount: 25.0,
            status: OrderStatus::Paid,
            items: vec![],
            create_time: Utc::now(),
            update_time: Some(Utc::now()),
        };
        let event = OrderEvent::new(OrderEventKind::OrderPaid, order);
        let push = OrderPush::from_event(&event, "Payment confirmed for order ORD7");

        let value = serde_json::to_value(&push).unwrap();
        assert_eq!(value["type"], "order_paid");
        assert_eq!(value["orderId"], "o1");
        assert_eq!(value["orderNumber"], "ORD7");
        assert_eq!(value["status"], "PAID");
        assert_eq!(value["message"], "Payment confirmed for order ORD7");
        assert_eq!(value["timestamp"], event.occurred_at.timestamp_millis());
    }
}
