use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    AlertThreshold, ItemId, MovementQuery, Result, StockAdjustment, StockKey, StockLevel,
    StockMovement, ThresholdRegistry, ThresholdUpdate, WarehouseId,
    store::{StockLevelStore, lock_order, plan_batch, record_batch_metrics, validate_adjustments},
};

#[derive(Debug)]
struct Slot {
    level: StockLevel,
    /// False until the first successful write, so a failed first
    /// adjustment does not surface an empty row.
    committed: bool,
}

type SlotHandle = Arc<Mutex<Slot>>;

/// In-memory stock store.
///
/// Each (item, warehouse) key has its own mutex. A batch locks all of its
/// keys in sorted order before touching any quantity, so writers to the same
/// key are serialized while unrelated keys proceed in parallel.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    slots: Arc<RwLock<HashMap<StockKey, SlotHandle>>>,
    movements: Arc<RwLock<Vec<StockMovement>>>,
}

impl InMemoryStockStore {
    /// Creates a new empty in-memory stock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded movements.
    pub async fn movement_count(&self) -> usize {
        self.movements.read().await.len()
    }

    async fn slot(&self, key: StockKey) -> SlotHandle {
        if let Some(slot) = self.slots.read().await.get(&key) {
            return slot.clone();
        }

        let mut slots = self.slots.write().await;
        slots
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Slot {
                    level: StockLevel::empty(key),
                    committed: false,
                }))
            })
            .clone()
    }

    /// Snapshots the handles of every key matching `filter`, in key order.
    async fn handles_where<F>(&self, filter: F) -> Vec<SlotHandle>
    where
        F: Fn(&StockKey) -> bool,
    {
        let slots = self.slots.read().await;
        let mut matching: Vec<_> = slots
            .iter()
            .filter(|(key, _)| filter(key))
            .map(|(key, handle)| (*key, handle.clone()))
            .collect();
        matching.sort_by_key(|(key, _)| *key);
        matching.into_iter().map(|(_, handle)| handle).collect()
    }

    async fn committed_levels<F>(&self, filter: F) -> Vec<StockLevel>
    where
        F: Fn(&StockKey) -> bool,
    {
        let mut levels = Vec::new();
        for handle in self.handles_where(filter).await {
            let slot = handle.lock().await;
            if slot.committed {
                levels.push(slot.level.clone());
            }
        }
        levels
    }
}

#[async_trait]
impl StockLevelStore for InMemoryStockStore {
    async fn get_quantity(&self, item_id: ItemId, warehouse_id: WarehouseId) -> Result<Decimal> {
        let key = StockKey::new(item_id, warehouse_id);
        let handle = self.slots.read().await.get(&key).cloned();
        match handle {
            Some(handle) => Ok(handle.lock().await.level.quantity),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn get_aggregate_quantity(&self, item_id: ItemId) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for handle in self.handles_where(|key| key.item_id == item_id).await {
            total = total.saturating_add(handle.lock().await.level.quantity);
        }
        Ok(total)
    }

    #[tracing::instrument(skip(self, adjustments), fields(lines = adjustments.len()))]
    async fn apply(&self, adjustments: Vec<StockAdjustment>) -> Result<Vec<Decimal>> {
        validate_adjustments(&adjustments)?;

        let keys = lock_order(&adjustments);
        let mut guards: Vec<OwnedMutexGuard<Slot>> = Vec::with_capacity(keys.len());
        for key in &keys {
            let handle = self.slot(*key).await;
            guards.push(handle.lock_owned().await);
        }

        let current: HashMap<StockKey, Decimal> = keys
            .iter()
            .zip(&guards)
            .map(|(key, slot)| (*key, slot.level.quantity))
            .collect();

        let result = plan_batch(&adjustments, &current);
        record_batch_metrics(&result, adjustments.len());
        let quantities = result?;

        let now = Utc::now();
        let mut records = Vec::with_capacity(adjustments.len());
        for (adjustment, quantity) in adjustments.iter().zip(&quantities) {
            if let Ok(index) = keys.binary_search(&adjustment.key) {
                let slot = &mut guards[index];
                slot.level.quantity = *quantity;
                slot.level.updated_at = now;
                slot.committed = true;
            }
            records.push(StockMovement::record(adjustment, *quantity));
        }

        // Ledger is written before the key locks are released.
        self.movements.write().await.extend(records);
        drop(guards);

        tracing::debug!(lines = adjustments.len(), "stock batch applied");
        Ok(quantities)
    }

    async fn list_by_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<StockLevel>> {
        Ok(self
            .committed_levels(|key| key.warehouse_id == warehouse_id)
            .await)
    }

    async fn list_by_item(&self, item_id: ItemId) -> Result<Vec<StockLevel>> {
        Ok(self.committed_levels(|key| key.item_id == item_id).await)
    }

    async fn set_location(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        location: Option<String>,
    ) -> Result<StockLevel> {
        let handle = self.slot(StockKey::new(item_id, warehouse_id)).await;
        let mut slot = handle.lock().await;
        slot.level.location = location;
        slot.level.updated_at = Utc::now();
        slot.committed = true;
        Ok(slot.level.clone())
    }

    async fn query_movements(&self, query: MovementQuery) -> Result<Vec<StockMovement>> {
        let movements = self.movements.read().await;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        // Appended in commit order, so reversing gives newest first.
        Ok(movements
            .iter()
            .rev()
            .filter(|m| query.matches(m))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-memory threshold registry.
#[derive(Clone, Default)]
pub struct InMemoryThresholdRegistry {
    thresholds: Arc<RwLock<BTreeMap<ItemId, AlertThreshold>>>,
}

impl InMemoryThresholdRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThresholdRegistry for InMemoryThresholdRegistry {
    async fn get(&self, item_id: ItemId) -> Result<Option<AlertThreshold>> {
        Ok(self.thresholds.read().await.get(&item_id).cloned())
    }

    async fn upsert(&self, item_id: ItemId, update: ThresholdUpdate) -> Result<AlertThreshold> {
        update.validate()?;
        let threshold = update.into_threshold(item_id);
        self.thresholds
            .write()
            .await
            .insert(item_id, threshold.clone());
        Ok(threshold)
    }

    async fn list(&self) -> Result<Vec<AlertThreshold>> {
        Ok(self.thresholds.read().await.values().cloned().collect())
    }
}
