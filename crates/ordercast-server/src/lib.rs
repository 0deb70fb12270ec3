//! # ordercast-server
//!
//! Axum HTTP + WebSocket server for the ordercast real-time order
//! notification service.
//!
//! The server exposes two WebSocket endpoints (`/ws/app` for consumer apps,
//! `/ws/store` for store terminals) speaking the JSON text-frame protocol in
//! [`websocket::protocol`], a small REST surface for order CRUD and presence
//! queries, plus `/health` and `/metrics`.
//!
//! Live sessions are tracked in two independent [`websocket::SessionRegistry`]
//! instances. Order mutations flow through the [`orders::OrderService`] onto
//! the in-process event bus, where one dispatcher task per recipient class
//! ([`dispatch`]) pushes notifications to live channels and mirrors paid
//! orders to the durable broker.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use orders::{OrderService, OrderServiceError};
pub use server::{AppState, OrdercastServer, ServerError, ServerHandle};
pub use shutdown::ShutdownCoordinator;
pub use websocket::{ClientSession, SessionRegistry};
