use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_store::AlertThreshold;

/// Derived classification of an item's aggregate quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    OutOfStock,
    LowStock,
    Normal,
}

impl AlertLevel {
    /// Classifies `quantity` against an item's thresholds. Items without
    /// thresholds are always normal.
    pub fn classify(quantity: Decimal, threshold: Option<&AlertThreshold>) -> Self {
        let Some(threshold) = threshold else {
            return AlertLevel::Normal;
        };

        if quantity.is_zero() {
            AlertLevel::OutOfStock
        } else if quantity < threshold.minimum_stock_level {
            AlertLevel::LowStock
        } else {
            AlertLevel::Normal
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, AlertLevel::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::OutOfStock => "out_of_stock",
            AlertLevel::LowStock => "low_stock",
            AlertLevel::Normal => "normal",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use common::ItemId;
    use stock_store::ThresholdUpdate;

    use super::*;

    fn threshold(min: i64, point: i64) -> AlertThreshold {
        ThresholdUpdate {
            minimum_stock_level: Decimal::from(min),
            maximum_stock_level: None,
            reorder_point: Decimal::from(point),
            reorder_quantity: Decimal::from(20),
        }
        .into_threshold(ItemId::new(1))
    }

    #[test]
    fn test_unconfigured_item_is_normal() {
        assert_eq!(AlertLevel::classify(Decimal::ZERO, None), AlertLevel::Normal);
    }

    #[test]
    fn test_classification_boundaries() {
        let t = threshold(10, 15);
        assert_eq!(AlertLevel::classify(Decimal::ZERO, Some(&t)), AlertLevel::OutOfStock);
        assert_eq!(AlertLevel::classify(Decimal::from(8), Some(&t)), AlertLevel::LowStock);
        assert_eq!(AlertLevel::classify(Decimal::from(10), Some(&t)), AlertLevel::Normal);
        assert_eq!(AlertLevel::classify(Decimal::new(995, 2), Some(&t)), AlertLevel::LowStock);
    }

    #[test]
    fn test_zero_minimum_still_flags_empty_stock() {
        let t = threshold(0, 0);
        assert_eq!(AlertLevel::classify(Decimal::ZERO, Some(&t)), AlertLevel::OutOfStock);
        assert_eq!(AlertLevel::classify(Decimal::ONE, Some(&t)), AlertLevel::Normal);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&AlertLevel::OutOfStock).unwrap(),
            "\"out_of_stock\""
        );
        assert_eq!(AlertLevel::LowStock.to_string(), "low_stock");
        assert!(AlertLevel::LowStock.is_active());
        assert!(!AlertLevel::Normal.is_active());
    }
}
