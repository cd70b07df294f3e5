//! Read-side alerting for stock levels.
//!
//! This crate provides:
//! - [`AlertLevel`], the classification of an item's aggregate quantity
//! - [`AlertEvaluator`], which joins live quantities with per-item thresholds
//!   to list active alerts and reorder suggestions
//!
//! Nothing here holds state or writes stock; every call reads the current
//! quantities on demand.

pub mod error;
pub mod evaluator;
pub mod level;

pub use error::{AlertError, Result};
pub use evaluator::{AlertEvaluator, ReorderSuggestion, StockAlert};
pub use level::AlertLevel;
