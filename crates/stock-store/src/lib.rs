//! Storage layer for per-warehouse stock quantities.
//!
//! This crate provides:
//! - `StockLevelStore`, the only primitive allowed to change a quantity
//! - `ThresholdRegistry`, per-item alert and reorder configuration
//! - an append-only movement ledger written alongside every quantity change
//! - in-memory and PostgreSQL backends for both

pub mod amount;
pub mod error;
pub mod level;
pub mod memory;
pub mod movement;
pub mod postgres;
pub mod query;
pub mod store;
pub mod threshold;

pub use amount::{AMOUNT_SCALE, AmountError, check_amount};
pub use common::{ActorId, ItemId, WarehouseId};
pub use error::{Result, Shortfall, StockStoreError};
pub use level::{StockAdjustment, StockKey, StockLevel};
pub use memory::{InMemoryStockStore, InMemoryThresholdRegistry};
pub use movement::{MovementKind, StockMovement};
pub use postgres::{PostgresStockStore, PostgresThresholdRegistry};
pub use query::MovementQuery;
pub use store::{StockLevelStore, StockLevelStoreExt};
pub use threshold::{AlertThreshold, ThresholdRegistry, ThresholdUpdate};
