//! Order REST handlers and presence endpoints.
//!
//! Response bodies keep the `{"success": ..., "message"/"orderId": ...}`
//! envelope the web clients already parse, so the status code and the
//! `success` flag always agree.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use ordercast_core::{ClientId, OrderDraft, OrderId, OrderStatus};

use crate::orders::OrderServiceError;
use crate::server::AppState;

/// Body of a successful `POST /api/orders`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Always `true` here; failures use [`StatusResponse`].
    pub success: bool,
    /// Id of the freshly created order.
    pub order_id: OrderId,
}

/// Generic outcome envelope for mutations and failures.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether the request took effect.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Query parameters of `POST /api/orders/status/{orderId}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusParams {
    /// Target status code, parsed case-insensitively.
    pub status: String,
    /// User on whose behalf the transition happens.
    pub user_id: ClientId,
    /// Store performing the transition.
    pub store_id: ClientId,
}

/// Body of `GET /api/websocket/stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStats {
    /// Users with a registered realtime session.
    pub online_user_count: usize,
    /// Stores with a registered realtime session.
    pub online_store_count: usize,
}

/// `POST /api/orders`: create an order from a draft.
pub async fn create_order(
    State(state): State<AppState>,
    Json(draft): Json<OrderDraft>,
) -> Response {
    match state.orders.create_order(draft).await {
        Ok(order_id) => Json(CreateOrderResponse {
            success: true,
            order_id,
        })
        .into_response(),
        Err(error) => {
            error!(%error, "order creation failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `POST /api/orders/status/{orderId}`: move an order to a new status.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Query(params): Query<UpdateStatusParams>,
) -> Response {
    let Ok(status) = OrderStatus::parse(&params.status) else {
        return failure(StatusCode::BAD_REQUEST, "Invalid order status");
    };
    match state
        .orders
        .update_status(&order_id, status, &params.user_id, &params.store_id)
        .await
    {
        Ok(()) => Json(StatusResponse {
            success: true,
            message: "Order status updated successfully".to_owned(),
        })
        .into_response(),
        Err(OrderServiceError::NotFound(_)) => failure(
            StatusCode::BAD_REQUEST,
            "Failed to update order status, order may not exist or unauthorized",
        ),
        Err(error) => {
            error!(%error, order_id = %order_id, "order status update failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `GET /api/orders/{orderId}`: fetch one order.
pub async fn get_order(State(state): State<AppState>, Path(order_id): Path<OrderId>) -> Response {
    match state.orders.get_order(&order_id).await {
        Ok(Some(order)) => Json(order).into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, "Order not found"),
        Err(error) => {
            error!(%error, order_id = %order_id, "order lookup failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `GET /api/websocket/users/online`: ids of users currently connected.
pub async fn online_users(State(state): State<AppState>) -> Json<Vec<ClientId>> {
    Json(state.users.client_ids())
}

/// `GET /api/websocket/stores/online`: ids of stores currently connected.
pub async fn online_stores(State(state): State<AppState>) -> Json<Vec<ClientId>> {
    Json(state.stores.client_ids())
}

/// `GET /api/websocket/stats`: presence counters for both registries.
pub async fn websocket_stats(State(state): State<AppState>) -> Json<PresenceStats> {
    Json(PresenceStats {
        online_user_count: state.users.len(),
        online_store_count: state.stores.len(),
    })
}

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(StatusResponse {
            success: false,
            message: message.to_owned(),
        }),
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
