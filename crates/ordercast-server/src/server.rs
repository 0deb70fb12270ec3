//! Server assembly: shared state, router, listener and serve loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use ordercast_core::ConnectionId;

use crate::api;
use crate::config::ServerConfig;
use crate::health::{HealthResponse, health_check};
use crate::orders::OrderService;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::{SessionRegistry, run_channel};

/// Errors from server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Registry of connected consumer apps.
    pub users: Arc<SessionRegistry>,
    /// Registry of connected store terminals.
    pub stores: Arc<SessionRegistry>,
    /// Order write path.
    pub orders: Arc<OrderService>,
    /// Handle for rendering `/metrics`.
    pub metrics: PrometheusHandle,
    start_time: Instant,
    open_channels: Arc<AtomicUsize>,
    send_queue_size: usize,
    max_message_size: usize,
    max_connections: usize,
}

/// The assembled notification server.
///
/// Owns the two session registries and the shutdown coordinator; the daemon
/// borrows them to wire the sweeper and the dispatchers.
pub struct OrdercastServer {
    config: ServerConfig,
    users: Arc<SessionRegistry>,
    stores: Arc<SessionRegistry>,
    orders: Arc<OrderService>,
    metrics: PrometheusHandle,
    shutdown: ShutdownCoordinator,
    start_time: Instant,
    open_channels: Arc<AtomicUsize>,
}

impl OrdercastServer {
    /// Assemble a server around an order service and a metrics handle.
    #[must_use]
    pub fn new(config: ServerConfig, orders: Arc<OrderService>, metrics: PrometheusHandle) -> Self {
        let users = Arc::new(SessionRegistry::new("user", config.heartbeat_timeout));
        let stores = Arc::new(SessionRegistry::new("store", config.heartbeat_timeout));
        Self {
            users,
            stores,
            orders,
            metrics,
            shutdown: ShutdownCoordinator::new(),
            start_time: Instant::now(),
            open_channels: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Registry of connected consumer apps.
    #[must_use]
    pub fn users(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.users)
    }

    /// Registry of connected store terminals.
    #[must_use]
    pub fn stores(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.stores)
    }

    /// Shutdown coordinator shared with every background task.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Build the router with all routes and layers.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            users: Arc::clone(&self.users),
            stores: Arc::clone(&self.stores),
            orders: Arc::clone(&self.orders),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
            open_channels: Arc::clone(&self.open_channels),
            send_queue_size: self.config.send_queue_size,
            max_message_size: self.config.max_message_size,
            max_connections: self.config.max_connections,
        };
        Router::new()
            .route("/ws/app", get(user_ws_handler))
            .route("/ws/store", get(store_ws_handler))
            .route("/api/orders", post(api::create_order))
            .route("/api/orders/status/{order_id}", post(api::update_order_status))
            .route("/api/orders/{order_id}", get(api::get_order))
            .route("/api/websocket/users/online", get(api::online_users))
            .route("/api/websocket/stores/online", get(api::online_stores))
            .route("/api/websocket/stats", get(api::websocket_stats))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and start serving.
    ///
    /// The serve loop runs until the shutdown coordinator fires.
    pub async fn listen(&self) -> Result<ServerHandle, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local = listener.local_addr()?;
        info!(addr = %local, "server listening");

        let router = self.router();
        let shutdown = self.shutdown.token();
        let serve = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(error) = result {
                error!(%error, "serve loop failed");
            }
        });
        Ok(ServerHandle { addr: local, serve })
    }
}

/// A running server: bound address plus the serve task.
pub struct ServerHandle {
    /// Address the listener is bound to.
    pub addr: SocketAddr,
    serve: JoinHandle<()>,
}

impl ServerHandle {
    /// Port the listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait until the serve loop exits.
    pub async fn stopped(self) -> Result<(), tokio::task::JoinError> {
        self.serve.await
    }
}

async fn user_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let registry = Arc::clone(&state.users);
    upgrade_channel(ws, &state, registry)
}

async fn store_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let registry = Arc::clone(&state.stores);
    upgrade_channel(ws, &state, registry)
}

/// Admission-check the connection, then hand the socket to [`run_channel`].
///
/// The open-channel count is maintained inside `run_channel`, so the check
/// here races new arrivals only by the handful currently upgrading.
fn upgrade_channel(
    ws: WebSocketUpgrade,
    state: &AppState,
    registry: Arc<SessionRegistry>,
) -> Response {
    if state.open_channels.load(Ordering::Relaxed) >= state.max_connections {
        info!(endpoint = registry.name(), "connection limit reached, upgrade refused");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let send_queue_size = state.send_queue_size;
    let open_channels = Arc::clone(&state.open_channels);
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| {
            run_channel(
                socket,
                ConnectionId::new(),
                registry,
                send_queue_size,
                open_channels,
            )
        })
        .into_response()
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(
        state.start_time,
        state.users.len(),
        state.stores.len(),
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    crate::metrics::render(&state.metrics)
}

// ─────────────────────────────────────────────────────────────────────────────
