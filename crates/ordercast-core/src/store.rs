//! Injected key-value storage for order snapshots.
//!
//! The notification core is storage-agnostic: anything honoring the
//! `put`/`get` contract can back it, so dispatch logic is testable without a
//! database. The bundled [`MemoryOrderStore`] is the documented single-process
//! model.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::StoreError;
use crate::ids::OrderId;
use crate::order::Order;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value storage contract for order snapshots.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert or replace an order snapshot keyed by its id.
    async fn put(&self, order: Order) -> StoreResult<()>;

    /// Fetch a copy of an order by id; `None` when absent.
    async fn get(&self, id: &OrderId) -> StoreResult<Option<Order>>;

    /// Number of stored orders.
    async fn count(&self) -> StoreResult<usize>;
}

/// In-memory store over a concurrent map.
///
/// Reads return defensive copies; callers never hold references into the map.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<OrderId, Order>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn put(&self, order: Order) -> StoreResult<()> {
        let _ = self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> StoreResult<Option<Order>> {
        Ok(self.orders.get(id).map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.orders.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
