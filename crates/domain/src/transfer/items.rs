use common::ItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_store::check_amount;

use super::TransferError;

/// One line of a transfer.
///
/// Name and unit price are snapshots taken at creation; they are never
/// repriced from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransferItem {
    pub inventory_item_id: ItemId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Always `quantity * unit_price`.
    pub line_total: Decimal,
    pub notes: Option<String>,
}

impl StockTransferItem {
    /// Prices a line. Quantity and unit price must fit the stored precision.
    pub fn new(
        inventory_item_id: ItemId,
        item_name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        notes: Option<String>,
    ) -> Result<Self, TransferError> {
        check_line_amount("quantity", quantity, inventory_item_id)?;
        check_line_amount("unit price", unit_price, inventory_item_id)?;
        let line_total = quantity.checked_mul(unit_price).ok_or_else(|| {
            TransferError::InvalidLineItem(format!(
                "line total for item {inventory_item_id} is out of range"
            ))
        })?;

        Ok(Self {
            inventory_item_id,
            item_name: item_name.into(),
            quantity,
            unit_price,
            line_total,
            notes,
        })
    }
}

/// Rejects a line quantity or price that the store would round or overflow.
pub(crate) fn check_line_amount(
    field: &str,
    value: Decimal,
    item_id: ItemId,
) -> Result<(), TransferError> {
    check_amount(value)
        .map_err(|e| TransferError::InvalidLineItem(format!("{field} for item {item_id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_is_quantity_times_price() {
        let line = StockTransferItem::new(
            ItemId::new(10),
            "Brake pad",
            Decimal::new(25, 1),
            Decimal::from(4),
            None,
        )
        .unwrap();
        assert_eq!(line.line_total, Decimal::from(10));
    }

    #[test]
    fn test_line_total_keeps_full_scale() {
        let line = StockTransferItem::new(
            ItemId::new(10),
            "Washer",
            Decimal::new(25, 2),
            Decimal::new(125, 3),
            None,
        )
        .unwrap();
        assert_eq!(line.line_total, Decimal::new(3125, 5));
    }

    #[test]
    fn test_huge_quantity_and_price_are_rejected() {
        let huge = Decimal::from(10_000_000_000_000_000_000u64);
        let result = StockTransferItem::new(ItemId::new(10), "Crate", huge, huge, None);
        assert!(matches!(result, Err(TransferError::InvalidLineItem(_))));
    }

    #[test]
    fn test_price_past_four_places_is_rejected() {
        let result = StockTransferItem::new(
            ItemId::new(10),
            "Washer",
            Decimal::ONE,
            Decimal::new(123_456, 5),
            None,
        );
        assert!(matches!(result, Err(TransferError::InvalidLineItem(_))));
    }
}
