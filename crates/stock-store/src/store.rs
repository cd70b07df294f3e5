use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    ItemId, check_amount, MovementKind, MovementQuery, Result, Shortfall, StockAdjustment, StockKey, StockLevel,
    StockMovement, StockStoreError, WarehouseId,
};

/// Authoritative per-warehouse, per-item quantity record.
///
/// `apply` is the only way to change a quantity. All implementations must be
/// thread-safe and must serialize concurrent writers per `StockKey` so that
/// no adjustment is computed from a stale quantity.
#[async_trait]
pub trait StockLevelStore: Send + Sync {
    /// Returns the quantity of an item in a warehouse, or zero if the pair
    /// has never been adjusted.
    async fn get_quantity(&self, item_id: ItemId, warehouse_id: WarehouseId) -> Result<Decimal>;

    /// Returns the sum of an item's quantity across all warehouses.
    async fn get_aggregate_quantity(&self, item_id: ItemId) -> Result<Decimal>;

    /// Applies a batch of adjustments as one atomic unit.
    ///
    /// Every involved key is locked before any delta is applied. If any line
    /// would leave a negative quantity, nothing is committed and
    /// `InsufficientStock` lists every failing line. On success a movement is
    /// recorded per line and the resulting quantities are returned in input
    /// order.
    async fn apply(&self, adjustments: Vec<StockAdjustment>) -> Result<Vec<Decimal>>;

    /// Lists the stock levels held by a warehouse.
    async fn list_by_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<StockLevel>>;

    /// Lists the stock levels of an item across warehouses.
    async fn list_by_item(&self, item_id: ItemId) -> Result<Vec<StockLevel>>;

    /// Sets the location label of a stock level, creating it at zero if needed.
    async fn set_location(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        location: Option<String>,
    ) -> Result<StockLevel>;

    /// Queries the movement ledger.
    async fn query_movements(&self, query: MovementQuery) -> Result<Vec<StockMovement>>;
}

/// Extension trait providing convenience methods for stock stores.
#[async_trait]
pub trait StockLevelStoreExt: StockLevelStore {
    /// Applies a single delta and returns the new quantity.
    async fn adjust(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        delta: Decimal,
    ) -> Result<Decimal> {
        let kind = if delta < Decimal::ZERO {
            MovementKind::Out
        } else {
            MovementKind::In
        };
        let mut quantities = self
            .apply(vec![StockAdjustment::new(item_id, warehouse_id, delta, kind)])
            .await?;
        quantities
            .pop()
            .ok_or_else(|| StockStoreError::InvalidAdjustment("empty result".to_string()))
    }
}

// Blanket implementation for all StockLevelStore implementations
impl<T: StockLevelStore + ?Sized> StockLevelStoreExt for T {}

/// Validates a batch before any lock is taken.
pub fn validate_adjustments(adjustments: &[StockAdjustment]) -> Result<()> {
    if adjustments.is_empty() {
        return Err(StockStoreError::InvalidAdjustment(
            "cannot apply an empty adjustment batch".to_string(),
        ));
    }

    for adjustment in adjustments {
        if adjustment.delta.is_zero() {
            return Err(StockStoreError::InvalidAdjustment(format!(
                "zero delta for {}",
                adjustment.key
            )));
        }
        check_amount(adjustment.delta).map_err(|e| {
            StockStoreError::InvalidAdjustment(format!("delta for {}: {e}", adjustment.key))
        })?;
    }

    Ok(())
}

/// Returns the distinct keys of a batch in lock order.
pub fn lock_order(adjustments: &[StockAdjustment]) -> Vec<StockKey> {
    adjustments
        .iter()
        .map(|a| a.key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Computes the resulting quantity of every line, given the locked
/// quantities of all involved keys.
///
/// Lines touching the same key are applied in input order, so a batch may
/// draw the same key down more than once. Every line that would go negative
/// is reported, not only the first. A line whose result would leave the
/// storable range fails the whole batch with `InvalidAdjustment`.
pub fn plan_batch(
    adjustments: &[StockAdjustment],
    current: &HashMap<StockKey, Decimal>,
) -> Result<Vec<Decimal>> {
    let mut running = current.clone();
    let mut results = Vec::with_capacity(adjustments.len());
    let mut shortfalls = Vec::new();

    for adjustment in adjustments {
        let on_hand = running.get(&adjustment.key).copied().unwrap_or_default();
        let next = on_hand
            .checked_add(adjustment.delta)
            .filter(|next| check_amount(*next).is_ok())
            .ok_or_else(|| {
                StockStoreError::InvalidAdjustment(format!(
                    "{} + {} for {} is out of range",
                    on_hand, adjustment.delta, adjustment.key
                ))
            })?;

        if next < Decimal::ZERO {
            shortfalls.push(Shortfall {
                item_id: adjustment.key.item_id,
                warehouse_id: adjustment.key.warehouse_id,
                available: on_hand,
                requested: -adjustment.delta,
            });
            results.push(on_hand);
            continue;
        }

        running.insert(adjustment.key, next);
        results.push(next);
    }

    if shortfalls.is_empty() {
        Ok(results)
    } else {
        Err(StockStoreError::InsufficientStock { shortfalls })
    }
}

/// Records the outcome of a batch in metrics.
pub(crate) fn record_batch_metrics(result: &Result<Vec<Decimal>>, lines: usize) {
    match result {
        Ok(_) => {
            metrics::counter!("stock_adjustments_total").increment(lines as u64);
        }
        Err(StockStoreError::InsufficientStock { .. }) => {
            metrics::counter!("stock_insufficient_total").increment(1);
        }
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(item: i64, warehouse: i64) -> StockKey {
        StockKey::new(ItemId::new(item), WarehouseId::new(warehouse))
    }

    fn adj(item: i64, warehouse: i64, delta: i64) -> StockAdjustment {
        StockAdjustment::new(
            ItemId::new(item),
            WarehouseId::new(warehouse),
            Decimal::from(delta),
            MovementKind::Adjustment,
        )
    }

    #[test]
    fn validate_rejects_empty_batch() {
        assert!(matches!(
            validate_adjustments(&[]),
            Err(StockStoreError::InvalidAdjustment(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_delta() {
        let result = validate_adjustments(&[adj(1, 1, 5), adj(2, 1, 0)]);
        assert!(matches!(result, Err(StockStoreError::InvalidAdjustment(_))));
    }

    #[test]
    fn lock_order_is_sorted_and_distinct() {
        let keys = lock_order(&[adj(2, 1, 1), adj(1, 2, 1), adj(2, 1, -1)]);
        assert_eq!(keys, vec![key(1, 2), key(2, 1)]);
    }

    #[test]
    fn plan_applies_lines_in_order() {
        let current = HashMap::from([(key(1, 1), Decimal::from(10))]);
        let result = plan_batch(&[adj(1, 1, -4), adj(1, 1, -6), adj(2, 1, 3)], &current).unwrap();
        assert_eq!(
            result,
            vec![Decimal::from(6), Decimal::ZERO, Decimal::from(3)]
        );
    }

    #[test]
    fn plan_reports_every_failing_line() {
        let current = HashMap::from([(key(1, 1), Decimal::from(3))]);
        let err = plan_batch(&[adj(1, 1, -5), adj(2, 1, -1), adj(3, 1, 2)], &current).unwrap_err();

        let shortfalls = err.shortfalls();
        assert_eq!(shortfalls.len(), 2);
        assert_eq!(shortfalls[0].available, Decimal::from(3));
        assert_eq!(shortfalls[0].requested, Decimal::from(5));
        assert_eq!(shortfalls[1].item_id, ItemId::new(2));
        assert_eq!(shortfalls[1].available, Decimal::ZERO);
    }

    #[test]
    fn validate_rejects_delta_past_stored_precision() {
        let tiny = StockAdjustment::new(
            ItemId::new(1),
            WarehouseId::new(1),
            Decimal::new(4, 5),
            MovementKind::In,
        );
        assert!(matches!(
            validate_adjustments(&[tiny]),
            Err(StockStoreError::InvalidAdjustment(_))
        ));

        let huge = StockAdjustment::new(
            ItemId::new(1),
            WarehouseId::new(1),
            Decimal::MAX,
            MovementKind::In,
        );
        assert!(matches!(
            validate_adjustments(&[huge]),
            Err(StockStoreError::InvalidAdjustment(_))
        ));
    }

    #[test]
    fn plan_rejects_result_past_range_instead_of_overflowing() {
        let near_limit = Decimal::from(99_999_999_999_999i64);
        let current = HashMap::from([(key(1, 1), near_limit)]);
        let err = plan_batch(&[adj(1, 1, 1)], &current).unwrap_err();
        assert!(matches!(err, StockStoreError::InvalidAdjustment(_)));
        assert!(err.shortfalls().is_empty());
    }

    #[test]
    fn plan_allows_draining_to_exactly_zero() {
        let current = HashMap::from([(key(1, 1), Decimal::from(5))]);
        let result = plan_batch(&[adj(1, 1, -5)], &current).unwrap();
        assert_eq!(result, vec![Decimal::ZERO]);
    }
}
