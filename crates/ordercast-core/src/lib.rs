//! # ordercast-core
//!
//! Foundation types for the ordercast real-time order notification service.
//!
//! This crate provides the shared vocabulary that all other ordercast crates
//! depend on:
//!
//! - **Branded IDs**: `OrderId`, `ClientId`, `ConnectionId` as newtypes for type safety
//! - **Order model**: `Order` snapshots, `OrderItem` lines, `OrderStatus` lifecycle enum
//! - **Events**: `OrderEvent` + `OrderEventKind` carried by the in-process event bus
//! - **Storage**: the injected `OrderStore` contract with an in-memory backend
//! - **Errors**: `CoreError`/`StoreError` hierarchies via `thiserror`

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod order;
pub mod store;

pub use errors::{CoreError, StoreError};
pub use events::{OrderEvent, OrderEventKind};
pub use ids::{ClientId, ConnectionId, OrderId};
pub use order::{Order, OrderDraft, OrderItem, OrderStatRecord, OrderStatus};
pub use store::{MemoryOrderStore, OrderStore, StoreResult};
