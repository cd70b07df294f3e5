//! Alert evaluation error types.

use thiserror::Error;

/// Errors that can occur while evaluating alerts.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Reading quantities or thresholds failed.
    #[error("{0}")]
    Stock(#[from] stock_store::StockStoreError),

    /// A catalog lookup failed or referenced an unknown item.
    #[error("{0}")]
    Domain(#[from] domain::DomainError),

    /// Reorder quantity times the catalog price does not fit a decimal.
    #[error("estimated reorder cost for item {0} is out of range")]
    CostOutOfRange(common::ItemId),
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
