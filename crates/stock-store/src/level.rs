use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ActorId, ItemId, MovementKind, WarehouseId};

/// Composite key of a stock level row.
///
/// Ordering is (item, warehouse); batches lock keys in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
}

impl StockKey {
    pub fn new(item_id: ItemId, warehouse_id: WarehouseId) -> Self {
        Self {
            item_id,
            warehouse_id,
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {} @ warehouse {}", self.item_id, self.warehouse_id)
    }
}

/// Quantity of one item physically present in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    /// Never negative.
    pub quantity: Decimal,
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// Creates an empty level for a key, as happens on its first adjustment.
    pub fn empty(key: StockKey) -> Self {
        Self {
            item_id: key.item_id,
            warehouse_id: key.warehouse_id,
            quantity: Decimal::ZERO,
            location: None,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.item_id, self.warehouse_id)
    }
}

/// A signed quantity change requested against one stock level.
#[derive(Debug, Clone, PartialEq)]
pub struct StockAdjustment {
    pub key: StockKey,
    /// Positive to add stock, negative to remove it. Never zero.
    pub delta: Decimal,
    pub kind: MovementKind,
    /// Free-form reference recorded in the ledger, e.g. a transfer number.
    pub reference: Option<String>,
    pub actor: Option<ActorId>,
}

impl StockAdjustment {
    pub fn new(
        item_id: ItemId,
        warehouse_id: WarehouseId,
        delta: Decimal,
        kind: MovementKind,
    ) -> Self {
        Self {
            key: StockKey::new(item_id, warehouse_id),
            delta,
            kind,
            reference: None,
            actor: None,
        }
    }

    /// Sets the ledger reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the actor recorded in the ledger.
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Returns the adjustment that undoes this one.
    pub fn reversed(&self) -> Self {
        Self {
            key: self.key,
            delta: -self.delta,
            kind: MovementKind::Adjustment,
            reference: self.reference.clone(),
            actor: self.actor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_by_item_then_warehouse() {
        let mut keys = vec![
            StockKey::new(ItemId::new(2), WarehouseId::new(1)),
            StockKey::new(ItemId::new(1), WarehouseId::new(2)),
            StockKey::new(ItemId::new(1), WarehouseId::new(1)),
        ];
        keys.sort();
        assert_eq!(keys[0], StockKey::new(ItemId::new(1), WarehouseId::new(1)));
        assert_eq!(keys[1], StockKey::new(ItemId::new(1), WarehouseId::new(2)));
        assert_eq!(keys[2], StockKey::new(ItemId::new(2), WarehouseId::new(1)));
    }

    #[test]
    fn reversed_adjustment_negates_delta() {
        let adj = StockAdjustment::new(
            ItemId::new(10),
            WarehouseId::new(1),
            Decimal::from(-5),
            MovementKind::TransferOut,
        )
        .with_reference("ST-2026-000001")
        .by(ActorId::new(3));

        let rev = adj.reversed();
        assert_eq!(rev.delta, Decimal::from(5));
        assert_eq!(rev.kind, MovementKind::Adjustment);
        assert_eq!(rev.reference.as_deref(), Some("ST-2026-000001"));
        assert_eq!(rev.actor, Some(ActorId::new(3)));
    }
}
