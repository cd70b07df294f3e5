use std::collections::HashMap;
use std::sync::Arc;

use common::TransferId;
use tokio::sync::RwLock;

use super::StockTransfer;

/// Entries kept before one is dropped to make room.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Read-through cache of transfers, owned by the workflow.
///
/// Every mutation writes the fresh aggregate; delete evicts. A write never
/// replaces an entry with an older `version`, so a slow read cannot undo a
/// transition that committed after it loaded.
///
/// When full, finished transfers go first, least recently updated first.
#[derive(Clone)]
pub struct TransferCache {
    entries: Arc<RwLock<HashMap<TransferId, StockTransfer>>>,
    capacity: usize,
}

impl Default for TransferCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl TransferCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, id: TransferId) -> Option<StockTransfer> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Stores a transfer unless a newer version is already cached.
    pub async fn put(&self, transfer: StockTransfer) {
        let mut entries = self.entries.write().await;

        if let Some(cached) = entries.get(&transfer.id)
            && cached.version > transfer.version
        {
            return;
        }

        if entries.len() >= self.capacity
            && !entries.contains_key(&transfer.id)
            && let Some(oldest) = entries
                .values()
                .min_by_key(|t| (!t.status.is_terminal(), t.updated_at))
                .map(|t| t.id)
        {
            entries.remove(&oldest);
        }

        entries.insert(transfer.id, transfer);
    }

    pub async fn evict(&self, id: TransferId) {
        self.entries.write().await.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use common::{ActorId, ItemId, WarehouseId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::transfer::{CreateTransfer, StockTransferItem, TransferStatus};

    fn transfer(age_secs: i64) -> StockTransfer {
        let cmd = CreateTransfer::new(WarehouseId::new(1), WarehouseId::new(2), ActorId::new(1));
        let items = vec![
            StockTransferItem::new(ItemId::new(10), "Fuse", Decimal::ONE, Decimal::ONE, None)
                .unwrap(),
        ];
        let created = Utc::now() - Duration::seconds(age_secs);
        StockTransfer::new("ST-2026-000001".to_string(), &cmd, items, created).unwrap()
    }

    #[tokio::test]
    async fn test_older_version_does_not_replace_newer() {
        let cache = TransferCache::new();
        let pending = transfer(0);
        let mut approved = pending.clone();
        approved.approve(ActorId::new(2), Utc::now()).unwrap();

        cache.put(approved.clone()).await;
        cache.put(pending.clone()).await;

        let cached = cache.get(pending.id).await.unwrap();
        assert_eq!(cached.status, TransferStatus::Approved);
        assert_eq!(cached.version, approved.version);
    }

    #[tokio::test]
    async fn test_full_cache_drops_least_recently_updated() {
        let cache = TransferCache::with_capacity(2);
        let oldest = transfer(30);
        let middle = transfer(20);
        let newest = transfer(10);

        cache.put(oldest.clone()).await;
        cache.put(middle.clone()).await;
        cache.put(newest.clone()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(oldest.id).await.is_none());
        assert!(cache.get(middle.id).await.is_some());
        assert!(cache.get(newest.id).await.is_some());
    }

    #[tokio::test]
    async fn test_full_cache_drops_finished_transfers_first() {
        let cache = TransferCache::with_capacity(2);
        let open = transfer(30);
        let mut cancelled = transfer(20);
        cancelled.cancel(ActorId::new(2), None, Utc::now()).unwrap();

        cache.put(open.clone()).await;
        cache.put(cancelled.clone()).await;
        cache.put(transfer(10)).await;

        assert!(cache.get(open.id).await.is_some());
        assert!(cache.get(cancelled.id).await.is_none());
    }

    #[tokio::test]
    async fn test_rewriting_cached_entry_does_not_evict() {
        let cache = TransferCache::with_capacity(2);
        let first = transfer(30);
        let mut second = transfer(20);
        cache.put(first.clone()).await;
        cache.put(second.clone()).await;

        second.approve(ActorId::new(2), Utc::now()).unwrap();
        cache.put(second.clone()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(first.id).await.is_some());
    }
}
