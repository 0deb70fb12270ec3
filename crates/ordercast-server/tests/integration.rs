//! End-to-end integration tests using real WebSocket and HTTP clients.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use ordercast_bus::broker::topology::{NOTIFY_QUEUES, STAT_CREATE_KEY, STAT_QUEUE};
use ordercast_bus::{Broker, EventBus};
use ordercast_core::MemoryOrderStore;
use ordercast_server::dispatch::spawn_dispatchers;
use ordercast_server::websocket::run_sweeper;
use ordercast_server::{OrderService, OrdercastServer, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct Harness {
    http: String,
    ws_app: String,
    ws_store: String,
    server: Arc<OrdercastServer>,
    broker: Arc<Broker>,
}

/// Boot a fully wired server (dispatchers + sweeper) on an ephemeral port.
async fn boot_server_with(config: ServerConfig) -> Harness {
    let bus = EventBus::new();
    let broker = Arc::new(Broker::default());
    let orders = Arc::new(OrderService::new(
        Arc::new(MemoryOrderStore::new()),
        bus.clone(),
        Arc::clone(&broker),
    ));
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();
    let server = Arc::new(OrdercastServer::new(config, orders, metrics_handle));

    let token = server.shutdown().token();
    let _dispatchers = spawn_dispatchers(
        &bus,
        server.users(),
        server.stores(),
        Arc::clone(&broker),
        &token,
    );
    drop(tokio::spawn(run_sweeper(
        server.users(),
        server.stores(),
        server.config().sweep_interval,
        token,
    )));

    let handle = server.listen().await.unwrap();
    let addr = handle.addr;
    Harness {
        http: format!("http://{addr}"),
        ws_app: format!("ws://{addr}/ws/app"),
        ws_store: format!("ws://{addr}/ws/store"),
        server,
        broker,
    }
}

async fn boot_server() -> Harness {
    boot_server_with(ServerConfig::default()).await
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Read the next text message as JSON.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Try to read a JSON message within timeout. Returns None on timeout.
async fn try_read_json(ws: &mut WsStream, dur: Duration) -> Option<Value> {
    match timeout(dur, async {
        loop {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                return serde_json::from_str::<Value>(&text).ok();
            }
        }
    })
    .await
    {
        Ok(val) => val,
        Err(_) => None,
    }
}

/// Read until the connection terminates (close frame, error or EOF).
async fn read_until_closed(ws: &mut WsStream) {
    let result = timeout(Duration::from_secs(3), async {
        while let Some(msg) = ws.next().await {
            if msg.is_err() {
                break;
            }
            if let Ok(Message::Close(_)) = msg {
                break;
            }
        }
    })
    .await;
    let _ = result;
}

/// Identify on a freshly opened channel and wait for the ack.
async fn register(ws: &mut WsStream, client_id: &str) {
    let frame = json!({"type": "connect", "clientId": client_id}).to_string();
    ws.send(Message::text(frame)).await.unwrap();
    let msg = read_json(ws).await;
    assert_eq!(msg["type"], "connection_success");
    assert_eq!(msg["clientId"], client_id);
}

async fn create_order(harness: &Harness, user: &str, store: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/orders", harness.http))
        .json(&json!({"userId": user, "storeId": store, "amount": 30.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    body["orderId"].as_str().unwrap().to_owned()
}

async fn get_order(harness: &Harness, order_id: &str) -> Value {
    let resp = reqwest::get(format!("{}/api/orders/{order_id}", harness.http))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

async fn update_status(
    harness: &Harness,
    order_id: &str,
    status: &str,
    user: &str,
    store: &str,
) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!(
            "{}/api/orders/status/{order_id}?status={status}&userId={user}&storeId={store}",
            harness.http
        ))
        .send()
        .await
        .unwrap()
}

async fn presence_stats(harness: &Harness) -> Value {
    reqwest::get(format!("{}/api/websocket/stats", harness.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_connect_success() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;

    let frame = json!({"type": "connect", "clientId": "u1"}).to_string();
    ws.send(Message::text(frame)).await.unwrap();
    let msg = read_json(&mut ws).await;
    assert_eq!(msg["type"], "connection_success");
    assert_eq!(msg["message"], "Connected successfully");
    assert_eq!(msg["clientId"], "u1");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_connect_without_client_id_is_rejected() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;

    ws.send(Message::text(json!({"type": "connect"}).to_string()))
        .await
        .unwrap();
    let msg = read_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["message"], "Missing 'clientId' field in connect message");

    // The channel stays open; a proper connect still succeeds.
    register(&mut ws, "u1").await;

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_ping_pong() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;
    register(&mut ws, "u1").await;

    ws.send(Message::text(
        json!({"type": "ping", "clientId": "u1"}).to_string(),
    ))
    .await
    .unwrap();
    let msg = read_json(&mut ws).await;
    assert_eq!(msg, json!({"type": "pong"}));

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_unknown_type_gets_error() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;

    ws.send(Message::text(json!({"type": "subscribe"}).to_string()))
        .await
        .unwrap();
    let msg = read_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["message"], "Unknown message type: subscribe");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_missing_type_gets_error() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;

    ws.send(Message::text(json!({"clientId": "u1"}).to_string()))
        .await
        .unwrap();
    let msg = read_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["message"], "Missing 'type' field in message");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_malformed_frame_gets_error() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;

    ws.send(Message::text("{not json")).await.unwrap();
    let msg = read_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["message"], "Failed to process message");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_create_and_fetch_order() {
    let harness = boot_server().await;

    let order_id = create_order(&harness, "u1", "s1").await;
    let order = get_order(&harness, &order_id).await;
    assert_eq!(order["id"], order_id.as_str());
    assert_eq!(order["userId"], "u1");
    assert_eq!(order["storeId"], "s1");
    assert_eq!(order["status"], "CREATED");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD"));

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_new_order_notifies_the_store() {
    let harness = boot_server().await;
    let mut store_ws = connect(&harness.ws_store).await;
    register(&mut store_ws, "s1").await;

    let order_id = create_order(&harness, "u1", "s1").await;

    let msg = read_json(&mut store_ws).await;
    assert_eq!(msg["type"], "order_created");
    assert_eq!(msg["orderId"], order_id.as_str());
    assert_eq!(msg["message"], "New order received, please process");
    assert_eq!(msg["status"], "CREATED");
    assert!(msg["timestamp"].is_number());

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_status_update_notifies_the_user() {
    let harness = boot_server().await;
    let mut user_ws = connect(&harness.ws_app).await;
    register(&mut user_ws, "u1").await;

    let order_id = create_order(&harness, "u1", "s1").await;
    let order_number = get_order(&harness, &order_id).await["orderNumber"]
        .as_str()
        .unwrap()
        .to_owned();

    let resp = update_status(&harness, &order_id, "PROCESSING", "u1", "s1").await;
    assert_eq!(resp.status(), 200);

    let msg = read_json(&mut user_ws).await;
    assert_eq!(msg["type"], "order_updated");
    assert_eq!(msg["orderId"], order_id.as_str());
    assert_eq!(
        msg["message"],
        format!("Your order {order_number} has been updated")
    );
    assert_eq!(msg["status"], "PROCESSING");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_payment_notifies_both_parties_and_fans_out() {
    let harness = boot_server().await;
    let mut user_ws = connect(&harness.ws_app).await;
    let mut store_ws = connect(&harness.ws_store).await;
    register(&mut user_ws, "u1").await;
    register(&mut store_ws, "s1").await;

    let order_id = create_order(&harness, "u1", "s1").await;
    // Drain the creation push so the paid one is next on the store channel.
    let created = read_json(&mut store_ws).await;
    assert_eq!(created["type"], "order_created");

    let resp = update_status(&harness, &order_id, "PAID", "u1", "s1").await;
    assert_eq!(resp.status(), 200);

    let to_user = read_json(&mut user_ws).await;
    let to_store = read_json(&mut store_ws).await;
    for msg in [&to_user, &to_store] {
        assert_eq!(msg["type"], "order_paid");
        assert_eq!(msg["orderId"], order_id.as_str());
        assert_eq!(msg["status"], "PAID");
    }

    // One copy of the paid order per downstream notification queue.
    for name in NOTIFY_QUEUES {
        assert_eq!(harness.broker.queue_depth(name), Some(1));
    }
    let delivery = harness
        .broker
        .queue(NOTIFY_QUEUES[0])
        .unwrap()
        .try_pop()
        .unwrap();
    let event: Value = serde_json::from_str(&delivery.payload).unwrap();
    assert_eq!(event["kind"], "order_paid");
    assert_eq!(event["order"]["id"], order_id.as_str());

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_order_creation_queues_a_stat_record() {
    let harness = boot_server().await;

    let order_id = create_order(&harness, "u1", "s1").await;

    assert_eq!(harness.broker.queue_depth(STAT_QUEUE), Some(1));
    let delivery = harness.broker.queue(STAT_QUEUE).unwrap().try_pop().unwrap();
    assert_eq!(delivery.routing_key, STAT_CREATE_KEY);
    let record: Value = serde_json::from_str(&delivery.payload).unwrap();
    assert_eq!(record["orderId"], order_id.as_str());
    assert_eq!(record["status"], "CREATED");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_invalid_status_is_rejected() {
    let harness = boot_server().await;
    let order_id = create_order(&harness, "u1", "s1").await;

    let resp = update_status(&harness, &order_id, "TELEPORTED", "u1", "s1").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": false, "message": "Invalid order status"})
    );

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_missing_order_lookup_is_404() {
    let harness = boot_server().await;

    let resp = reqwest::get(format!("{}/api/orders/ghost", harness.http))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "message": "Order not found"}));

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_presence_endpoints_track_sessions() {
    let harness = boot_server().await;
    let mut user_ws = connect(&harness.ws_app).await;
    let mut store_ws = connect(&harness.ws_store).await;
    register(&mut user_ws, "u1").await;
    register(&mut store_ws, "s1").await;

    let stats = presence_stats(&harness).await;
    assert_eq!(stats, json!({"onlineUserCount": 1, "onlineStoreCount": 1}));

    let users: Value = reqwest::get(format!("{}/api/websocket/users/online", harness.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users, json!(["u1"]));

    let stores: Value = reqwest::get(format!("{}/api/websocket/stores/online", harness.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stores, json!(["s1"]));

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_reconnect_replaces_the_old_channel() {
    let harness = boot_server().await;
    let mut first = connect(&harness.ws_app).await;
    register(&mut first, "u1").await;

    let mut second = connect(&harness.ws_app).await;
    register(&mut second, "u1").await;

    // The superseded channel is closed by the registry.
    read_until_closed(&mut first).await;
    let stats = presence_stats(&harness).await;
    assert_eq!(stats["onlineUserCount"], 1);

    // Pushes land on the surviving channel only.
    let order_id = create_order(&harness, "u1", "s1").await;
    let resp = update_status(&harness, &order_id, "PROCESSING", "u1", "s1").await;
    assert_eq!(resp.status(), 200);
    let msg = read_json(&mut second).await;
    assert_eq!(msg["type"], "order_updated");

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_push_to_offline_client_is_dropped() {
    let harness = boot_server().await;
    let mut store_ws = connect(&harness.ws_store).await;
    register(&mut store_ws, "s1").await;

    // The buyer is offline; the store still gets its notification.
    let order_id = create_order(&harness, "offline-user", "s1").await;
    let resp = update_status(&harness, &order_id, "PROCESSING", "offline-user", "s1").await;
    assert_eq!(resp.status(), 200);

    let msg = read_json(&mut store_ws).await;
    assert_eq!(msg["type"], "order_created");
    assert!(try_read_json(&mut store_ws, Duration::from_millis(200))
        .await
        .is_none());

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_sweeper_evicts_silent_sessions() {
    let config = ServerConfig {
        heartbeat_timeout: Duration::from_millis(200),
        sweep_interval: Duration::from_millis(50),
        ..ServerConfig::default()
    };
    let harness = boot_server_with(config).await;
    let mut ws = connect(&harness.ws_app).await;
    register(&mut ws, "u1").await;
    assert_eq!(presence_stats(&harness).await["onlineUserCount"], 1);

    // No pings: the sweeper evicts the session once the timeout lapses.
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if presence_stats(&harness).await["onlineUserCount"] == 0 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "session never swept");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_heartbeats_keep_a_session_alive() {
    let config = ServerConfig {
        heartbeat_timeout: Duration::from_millis(500),
        sweep_interval: Duration::from_millis(100),
        ..ServerConfig::default()
    };
    let harness = boot_server_with(config).await;
    let mut ws = connect(&harness.ws_app).await;
    register(&mut ws, "u1").await;

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        ws.send(Message::text(
            json!({"type": "ping", "clientId": "u1"}).to_string(),
        ))
        .await
        .unwrap();
        let msg = read_json(&mut ws).await;
        assert_eq!(msg["type"], "pong");
    }

    assert_eq!(presence_stats(&harness).await["onlineUserCount"], 1);

    harness.server.shutdown().shutdown();
}

#[tokio::test]
async fn e2e_graceful_shutdown() {
    let harness = boot_server().await;
    let mut ws = connect(&harness.ws_app).await;
    register(&mut ws, "u1").await;

    harness.server.shutdown().shutdown();

    // Connection should eventually close — read until None or error
    read_until_closed(&mut ws).await;
}
