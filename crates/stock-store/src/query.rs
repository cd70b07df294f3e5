use chrono::{DateTime, Utc};

use crate::{ItemId, MovementKind, StockMovement, WarehouseId};

/// Builder for querying the movement ledger.
///
/// Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct MovementQuery {
    pub item_id: Option<ItemId>,
    pub warehouse_id: Option<WarehouseId>,
    pub kind: Option<MovementKind>,
    /// Exact match on the ledger reference (e.g. a transfer number).
    pub reference: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from_timestamp: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to_timestamp: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl MovementQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    pub fn warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if a movement passes every filter of this query.
    ///
    /// Pagination is not considered here.
    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(item) = self.item_id
            && movement.item_id != item
        {
            return false;
        }
        if let Some(warehouse) = self.warehouse_id
            && movement.warehouse_id != warehouse
        {
            return false;
        }
        if let Some(kind) = self.kind
            && movement.kind != kind
        {
            return false;
        }
        if let Some(ref reference) = self.reference
            && movement.reference.as_deref() != Some(reference.as_str())
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && movement.created_at < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && movement.created_at > to
        {
            return false;
        }
        true
    }
}
