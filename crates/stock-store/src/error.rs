use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{ItemId, WarehouseId};

/// One line of a batch that could not be applied without going negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    /// Quantity on hand when the line was evaluated.
    pub available: Decimal,
    /// Quantity the line tried to remove.
    pub requested: Decimal,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "item {} in warehouse {}: available {}, requested {}",
            self.item_id, self.warehouse_id, self.available, self.requested
        )
    }
}

fn describe(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur when interacting with the stock store.
#[derive(Debug, Error)]
pub enum StockStoreError {
    /// Applying the batch would drive at least one quantity below zero.
    /// Nothing was committed.
    #[error("Insufficient stock: {}", describe(.shortfalls))]
    InsufficientStock { shortfalls: Vec<Shortfall> },

    /// The adjustment batch is malformed (empty, or a zero delta).
    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    /// A threshold update violates min <= reorder point <= max.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StockStoreError {
    /// Returns the failing lines when this is an `InsufficientStock` error.
    pub fn shortfalls(&self) -> &[Shortfall] {
        match self {
            StockStoreError::InsufficientStock { shortfalls } => shortfalls,
            _ => &[],
        }
    }
}

/// Result type for stock store operations.
pub type Result<T> = std::result::Result<T, StockStoreError>;
