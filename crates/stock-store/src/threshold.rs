use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ItemId, Result, StockStoreError, check_amount};

/// Per-item alert and reorder configuration.
///
/// Thresholds apply to the item's aggregate quantity across warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub item_id: ItemId,
    pub minimum_stock_level: Decimal,
    /// `None` means unbounded.
    pub maximum_stock_level: Option<Decimal>,
    pub reorder_point: Decimal,
    pub reorder_quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Administrative change to an item's thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdUpdate {
    pub minimum_stock_level: Decimal,
    #[serde(default)]
    pub maximum_stock_level: Option<Decimal>,
    pub reorder_point: Decimal,
    pub reorder_quantity: Decimal,
}

impl ThresholdUpdate {
    /// Checks `0 <= minimum <= reorder point <= maximum`, a non-negative
    /// reorder quantity, and that every level fits the stored precision.
    pub fn validate(&self) -> Result<()> {
        let levels = [
            ("minimum stock level", Some(self.minimum_stock_level)),
            ("maximum stock level", self.maximum_stock_level),
            ("reorder point", Some(self.reorder_point)),
            ("reorder quantity", Some(self.reorder_quantity)),
        ];
        for (name, value) in levels {
            if let Some(value) = value {
                check_amount(value)
                    .map_err(|e| StockStoreError::InvalidThreshold(format!("{name}: {e}")))?;
            }
        }

        if self.minimum_stock_level < Decimal::ZERO {
            return Err(StockStoreError::InvalidThreshold(format!(
                "minimum stock level {} is negative",
                self.minimum_stock_level
            )));
        }
        if self.reorder_point < self.minimum_stock_level {
            return Err(StockStoreError::InvalidThreshold(format!(
                "reorder point {} is below minimum stock level {}",
                self.reorder_point, self.minimum_stock_level
            )));
        }
        if let Some(max) = self.maximum_stock_level
            && max < self.reorder_point
        {
            return Err(StockStoreError::InvalidThreshold(format!(
                "maximum stock level {max} is below reorder point {}",
                self.reorder_point
            )));
        }
        if self.reorder_quantity < Decimal::ZERO {
            return Err(StockStoreError::InvalidThreshold(format!(
                "reorder quantity {} is negative",
                self.reorder_quantity
            )));
        }
        Ok(())
    }

    /// Builds the stored threshold for an item.
    pub fn into_threshold(self, item_id: ItemId) -> AlertThreshold {
        AlertThreshold {
            item_id,
            minimum_stock_level: self.minimum_stock_level,
            maximum_stock_level: self.maximum_stock_level,
            reorder_point: self.reorder_point,
            reorder_quantity: self.reorder_quantity,
            updated_at: Utc::now(),
        }
    }
}

/// Registry of per-item thresholds. Read-mostly; no special locking.
#[async_trait]
pub trait ThresholdRegistry: Send + Sync {
    /// Returns the thresholds configured for an item, if any.
    async fn get(&self, item_id: ItemId) -> Result<Option<AlertThreshold>>;

    /// Creates or replaces an item's thresholds after validating them.
    async fn upsert(&self, item_id: ItemId, update: ThresholdUpdate) -> Result<AlertThreshold>;

    /// Lists every configured threshold, ordered by item id.
    async fn list(&self) -> Result<Vec<AlertThreshold>>;
}
