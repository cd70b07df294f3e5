//! Domain error types.

use common::TransferId;
use stock_store::StockStoreError;
use thiserror::Error;

use crate::transfer::TransferError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Validation or state machine failure.
    #[error("{0}")]
    Transfer(#[from] TransferError),

    /// Unknown transfer, warehouse or item.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The transfer was modified since it was loaded.
    #[error(
        "Concurrency conflict on transfer {transfer_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        transfer_id: TransferId,
        expected: i64,
        actual: i64,
    },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An error from the stock store, including `InsufficientStock`.
    #[error("{0}")]
    Stock(#[from] StockStoreError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
