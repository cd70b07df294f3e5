//! Transfer creation commands.

use chrono::{DateTime, Utc};
use common::{ActorId, ItemId, WarehouseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TransferError;
use super::items::check_line_amount;

/// Command to create a new transfer in `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransfer {
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    /// Defaults to the creation time.
    #[serde(default)]
    pub transfer_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewTransferItem>,
    pub created_by: ActorId,
}

impl CreateTransfer {
    pub fn new(
        from_warehouse_id: WarehouseId,
        to_warehouse_id: WarehouseId,
        created_by: ActorId,
    ) -> Self {
        Self {
            from_warehouse_id,
            to_warehouse_id,
            transfer_date: None,
            reason: None,
            notes: None,
            items: Vec::new(),
            created_by,
        }
    }

    pub fn with_item(mut self, item: NewTransferItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_transfer_date(mut self, date: DateTime<Utc>) -> Self {
        self.transfer_date = Some(date);
        self
    }

    /// Checks the shape of the command without consulting any catalog.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.from_warehouse_id == self.to_warehouse_id {
            return Err(TransferError::InvalidTransfer(format!(
                "source and destination warehouse are both {}",
                self.from_warehouse_id
            )));
        }

        if self.items.is_empty() {
            return Err(TransferError::InvalidLineItem(
                "a transfer needs at least one line item".to_string(),
            ));
        }

        for item in &self.items {
            if item.quantity <= Decimal::ZERO {
                return Err(TransferError::InvalidLineItem(format!(
                    "quantity {} for item {} must be greater than zero",
                    item.quantity, item.inventory_item_id
                )));
            }
            check_line_amount("quantity", item.quantity, item.inventory_item_id)?;
            if let Some(price) = item.unit_price {
                if price < Decimal::ZERO {
                    return Err(TransferError::InvalidLineItem(format!(
                        "unit price {price} for item {} is negative",
                        item.inventory_item_id
                    )));
                }
                check_line_amount("unit price", price, item.inventory_item_id)?;
            }
        }

        Ok(())
    }
}

/// A requested line of a new transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransferItem {
    pub inventory_item_id: ItemId,
    pub quantity: Decimal,
    /// Overrides the catalog purchase price when present.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransferItem {
    pub fn new(inventory_item_id: ItemId, quantity: Decimal) -> Self {
        Self {
            inventory_item_id,
            quantity,
            unit_price: None,
            notes: None,
        }
    }

    pub fn at_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}
