//! Error types for core domain parsing and storage.

use thiserror::Error;

/// Errors from core domain parsing and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Status string did not match any known order status.
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

/// Errors from order storage backends.
///
/// The in-memory backend never fails, but the contract leaves room for real
/// backends with I/O to report problems without widening the trait.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend rejected or failed the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
