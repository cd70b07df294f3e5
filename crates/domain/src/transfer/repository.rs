//! Transfer persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::TransferId;
use tokio::sync::RwLock;

use crate::error::DomainError;

use super::{Page, StockTransfer, TransferFilter, TransferStats};

/// Storage for transfers and their line items.
#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Stores a new transfer. Fails with `Conflict` if the id or transfer
    /// number is already taken.
    async fn insert(&self, transfer: &StockTransfer) -> Result<(), DomainError>;

    /// Replaces a stored transfer if its stored version is still
    /// `expected_version`; otherwise fails with `ConcurrencyConflict`.
    async fn update(
        &self,
        transfer: &StockTransfer,
        expected_version: i64,
    ) -> Result<(), DomainError>;

    async fn get(&self, id: TransferId) -> Result<Option<StockTransfer>, DomainError>;

    /// Removes a transfer and its line items. Returns false if it did not exist.
    async fn delete(&self, id: TransferId) -> Result<bool, DomainError>;

    /// Lists transfers matching the filter, newest first.
    async fn list(&self, filter: &TransferFilter) -> Result<Page<StockTransfer>, DomainError>;

    async fn stats(&self) -> Result<TransferStats, DomainError>;
}

/// In-memory transfer repository.
#[derive(Clone, Default)]
pub struct InMemoryTransferRepository {
    transfers: Arc<RwLock<HashMap<TransferId, StockTransfer>>>,
}

impl InMemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn insert(&self, transfer: &StockTransfer) -> Result<(), DomainError> {
        let mut transfers = self.transfers.write().await;

        if transfers.contains_key(&transfer.id) {
            return Err(DomainError::Conflict(format!(
                "transfer {} already exists",
                transfer.id
            )));
        }
        if transfers
            .values()
            .any(|t| t.transfer_number == transfer.transfer_number)
        {
            return Err(DomainError::Conflict(format!(
                "transfer number {} already exists",
                transfer.transfer_number
            )));
        }

        transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn update(
        &self,
        transfer: &StockTransfer,
        expected_version: i64,
    ) -> Result<(), DomainError> {
        let mut transfers = self.transfers.write().await;

        let stored = transfers
            .get_mut(&transfer.id)
            .ok_or_else(|| DomainError::not_found("Transfer", transfer.id))?;

        if stored.version != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                transfer_id: transfer.id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        *stored = transfer.clone();
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<StockTransfer>, DomainError> {
        Ok(self.transfers.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: TransferId) -> Result<bool, DomainError> {
        Ok(self.transfers.write().await.remove(&id).is_some())
    }

    async fn list(&self, filter: &TransferFilter) -> Result<Page<StockTransfer>, DomainError> {
        let transfers = self.transfers.read().await;

        let mut matching: Vec<&StockTransfer> =
            transfers.values().filter(|t| filter.matches(t)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.transfer_number.cmp(&a.transfer_number))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size() as usize)
            .cloned()
            .collect();

        Ok(Page::new(
            items,
            filter.page_number(),
            filter.page_size(),
            total,
        ))
    }

    async fn stats(&self) -> Result<TransferStats, DomainError> {
        let transfers = self.transfers.read().await;
        let mut stats = TransferStats::default();
        for transfer in transfers.values() {
            stats.record(transfer.status, 1, transfer.total_value);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use common::{ActorId, ItemId, WarehouseId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::transfer::{CreateTransfer, StockTransferItem, TransferStatus};

    fn transfer(number: &str, from: i64, to: i64, age_secs: i64) -> StockTransfer {
        let cmd = CreateTransfer::new(WarehouseId::new(from), WarehouseId::new(to), ActorId::new(1));
        let items = vec![StockTransferItem::new(
            ItemId::new(10),
            "Spark plug",
            Decimal::from(2),
            Decimal::from(5),
            None,
        )
        .unwrap()];
        let created = Utc::now() - Duration::seconds(age_secs);
        StockTransfer::new(number.to_string(), &cmd, items, created).unwrap()
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_number() {
        let repo = InMemoryTransferRepository::new();
        repo.insert(&transfer("ST-2026-000001", 1, 2, 0)).await.unwrap();

        let result = repo.insert(&transfer("ST-2026-000001", 1, 3, 0)).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let repo = InMemoryTransferRepository::new();
        let mut t = transfer("ST-2026-000001", 1, 2, 0);
        repo.insert(&t).await.unwrap();

        t.approve(ActorId::new(2), Utc::now()).unwrap();
        repo.update(&t, 1).await.unwrap();

        let result = repo.update(&t, 1).await;
        assert!(matches!(
            result,
            Err(DomainError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));

        let stored = repo.get(t.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransferStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let repo = InMemoryTransferRepository::new();
        let t = transfer("ST-2026-000001", 1, 2, 0);
        assert!(matches!(
            repo.update(&t, 1).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_paginates_newest_first() {
        let repo = InMemoryTransferRepository::new();
        repo.insert(&transfer("ST-2026-000001", 1, 2, 30)).await.unwrap();
        repo.insert(&transfer("ST-2026-000002", 1, 3, 20)).await.unwrap();
        repo.insert(&transfer("ST-2026-000003", 2, 3, 10)).await.unwrap();

        let page = repo
            .list(&TransferFilter::new().from_warehouse(WarehouseId::new(1)))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].transfer_number, "ST-2026-000002");

        let page = repo
            .list(&TransferFilter::new().paginate(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].transfer_number, "ST-2026-000001");
        assert!(page.has_prev);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn test_delete_and_stats() {
        let repo = InMemoryTransferRepository::new();
        let t = transfer("ST-2026-000001", 1, 2, 0);
        repo.insert(&t).await.unwrap();
        repo.insert(&transfer("ST-2026-000002", 1, 2, 0)).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 2);

        assert!(repo.delete(t.id).await.unwrap());
        assert!(!repo.delete(t.id).await.unwrap());
        assert_eq!(repo.stats().await.unwrap().total, 1);
    }
}
