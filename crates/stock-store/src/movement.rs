use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ActorId, ItemId, StockAdjustment, WarehouseId};

/// Why a quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received directly into a warehouse.
    In,
    /// Goods issued directly out of a warehouse.
    Out,
    /// Stock leaving the source warehouse of a transfer.
    TransferOut,
    /// Stock arriving at the destination warehouse of a transfer.
    TransferIn,
    /// Manual correction, or the reversal of a failed batch.
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            "transfer_out" => Ok(MovementKind::TransferOut),
            "transfer_in" => Ok(MovementKind::TransferIn),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(format!("unknown movement kind: {other}")),
        }
    }
}

/// Ledger row recording one applied quantity change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    pub kind: MovementKind,
    /// Signed delta that was applied.
    pub quantity: Decimal,
    /// Quantity on hand right after the change.
    pub resulting_quantity: Decimal,
    pub reference: Option<String>,
    pub actor: Option<ActorId>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Builds the ledger row for an adjustment that has just been applied.
    pub fn record(adjustment: &StockAdjustment, resulting_quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: adjustment.key.item_id,
            warehouse_id: adjustment.key.warehouse_id,
            kind: adjustment.kind,
            quantity: adjustment.delta,
            resulting_quantity,
            reference: adjustment.reference.clone(),
            actor: adjustment.actor,
            created_at: Utc::now(),
        }
    }
}
