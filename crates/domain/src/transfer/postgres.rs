use std::collections::HashMap;

use async_trait::async_trait;
use common::{ActorId, ItemId, TransferId, WarehouseId};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::DomainError;

use super::{
    Page, StockTransfer, StockTransferItem, TransferFilter, TransferRepository, TransferStats,
    TransferStatus,
};

const TRANSFER_COLUMNS: &str = "id, transfer_number, from_warehouse_id, to_warehouse_id, status, \
     transfer_date, reason, notes, total_items, total_value, requested_by, approved_by, \
     shipped_by, received_by, completed_by, closed_by, close_reason, created_at, approved_at, \
     shipped_at, received_at, completed_at, closed_at, updated_at, version";

/// PostgreSQL-backed transfer repository.
///
/// Line items live in `stock_transfer_items` and are removed with their
/// transfer through the foreign key cascade.
#[derive(Clone)]
pub struct PostgresTransferRepository {
    pool: PgPool,
}

impl PostgresTransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn actor(row: &PgRow, column: &str) -> Result<Option<ActorId>, DomainError> {
        Ok(row.try_get::<Option<i64>, _>(column)?.map(ActorId::new))
    }

    fn row_to_transfer(
        row: &PgRow,
        items: Vec<StockTransferItem>,
    ) -> Result<StockTransfer, DomainError> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<TransferStatus>()
            .map_err(|e| DomainError::Database(sqlx::Error::Decode(e.into())))?;
        let total_items: i32 = row.try_get("total_items")?;

        Ok(StockTransfer {
            id: TransferId::from_uuid(row.try_get::<Uuid, _>("id")?),
            transfer_number: row.try_get("transfer_number")?,
            from_warehouse_id: WarehouseId::new(row.try_get("from_warehouse_id")?),
            to_warehouse_id: WarehouseId::new(row.try_get("to_warehouse_id")?),
            transfer_date: row.try_get("transfer_date")?,
            reason: row.try_get("reason")?,
            notes: row.try_get("notes")?,
            status,
            items,
            total_items: total_items.max(0) as u32,
            total_value: row.try_get("total_value")?,
            created_by: ActorId::new(row.try_get("requested_by")?),
            approved_by: Self::actor(row, "approved_by")?,
            shipped_by: Self::actor(row, "shipped_by")?,
            received_by: Self::actor(row, "received_by")?,
            completed_by: Self::actor(row, "completed_by")?,
            closed_by: Self::actor(row, "closed_by")?,
            close_reason: row.try_get("close_reason")?,
            created_at: row.try_get("created_at")?,
            approved_at: row.try_get("approved_at")?,
            shipped_at: row.try_get("shipped_at")?,
            received_at: row.try_get("received_at")?,
            completed_at: row.try_get("completed_at")?,
            closed_at: row.try_get("closed_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<StockTransferItem, DomainError> {
        Ok(StockTransferItem {
            inventory_item_id: ItemId::new(row.try_get("inventory_item_id")?),
            item_name: row.try_get("item_name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            line_total: row.try_get("line_total")?,
            notes: row.try_get("notes")?,
        })
    }

    /// Loads the line items of several transfers at once.
    async fn load_items(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<StockTransferItem>>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT transfer_id, inventory_item_id, item_name, quantity, unit_price, line_total, notes
            FROM stock_transfer_items
            WHERE transfer_id = ANY($1)
            ORDER BY transfer_id, line_no ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<StockTransferItem>> = HashMap::new();
        for row in rows {
            let transfer_id: Uuid = row.try_get("transfer_id")?;
            items
                .entry(transfer_id)
                .or_default()
                .push(Self::row_to_item(&row)?);
        }
        Ok(items)
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TransferFilter) {
        builder.push(" WHERE 1=1");
        if let Some(from) = filter.from_warehouse_id {
            builder.push(" AND from_warehouse_id = ").push_bind(from.get());
        }
        if let Some(to) = filter.to_warehouse_id {
            builder.push(" AND to_warehouse_id = ").push_bind(to.get());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(start) = filter.start_date {
            builder.push(" AND transfer_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            builder.push(" AND transfer_date <= ").push_bind(end);
        }
    }
}

#[async_trait]
impl TransferRepository for PostgresTransferRepository {
    async fn insert(&self, transfer: &StockTransfer) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_transfers (
                id, transfer_number, from_warehouse_id, to_warehouse_id, status,
                transfer_date, reason, notes, total_items, total_value, requested_by,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(&transfer.transfer_number)
        .bind(transfer.from_warehouse_id.get())
        .bind(transfer.to_warehouse_id.get())
        .bind(transfer.status.as_str())
        .bind(transfer.transfer_date)
        .bind(&transfer.reason)
        .bind(&transfer.notes)
        .bind(transfer.total_items as i32)
        .bind(transfer.total_value)
        .bind(transfer.created_by.get())
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .bind(transfer.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DomainError::Conflict(format!(
                    "transfer number {} already exists",
                    transfer.transfer_number
                ));
            }
            DomainError::Database(e)
        })?;

        for (line_no, item) in transfer.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO stock_transfer_items
                    (transfer_id, line_no, inventory_item_id, item_name, quantity, unit_price, line_total, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(transfer.id.as_uuid())
            .bind(line_no as i32)
            .bind(item.inventory_item_id.get())
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_total)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        transfer: &StockTransfer,
        expected_version: i64,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_transfers SET
                status = $3,
                approved_by = $4,
                shipped_by = $5,
                received_by = $6,
                completed_by = $7,
                closed_by = $8,
                close_reason = $9,
                approved_at = $10,
                shipped_at = $11,
                received_at = $12,
                completed_at = $13,
                closed_at = $14,
                updated_at = $15,
                notes = $16,
                version = $17
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(expected_version)
        .bind(transfer.status.as_str())
        .bind(transfer.approved_by.map(|a| a.get()))
        .bind(transfer.shipped_by.map(|a| a.get()))
        .bind(transfer.received_by.map(|a| a.get()))
        .bind(transfer.completed_by.map(|a| a.get()))
        .bind(transfer.closed_by.map(|a| a.get()))
        .bind(&transfer.close_reason)
        .bind(transfer.approved_at)
        .bind(transfer.shipped_at)
        .bind(transfer.received_at)
        .bind(transfer.completed_at)
        .bind(transfer.closed_at)
        .bind(transfer.updated_at)
        .bind(&transfer.notes)
        .bind(transfer.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM stock_transfers WHERE id = $1")
                .bind(transfer.id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => Err(DomainError::ConcurrencyConflict {
                transfer_id: transfer.id,
                expected: expected_version,
                actual,
            }),
            None => Err(DomainError::not_found("Transfer", transfer.id)),
        }
    }

    async fn get(&self, id: TransferId) -> Result<Option<StockTransfer>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.load_items(&[id.as_uuid()]).await?;
        let items = items.remove(&id.as_uuid()).unwrap_or_default();
        Self::row_to_transfer(&row, items).map(Some)
    }

    async fn delete(&self, id: TransferId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM stock_transfers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &TransferFilter) -> Result<Page<StockTransfer>, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM stock_transfers");
        Self::push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {TRANSFER_COLUMNS} FROM stock_transfers"));
        Self::push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, transfer_number DESC LIMIT ")
            .push_bind(i64::from(filter.page_size()))
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);
        let rows = select.build().fetch_all(&self.pool).await?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()?;
        let mut items = self.load_items(&ids).await?;

        let transfers = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| Self::row_to_transfer(row, items.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(
            transfers,
            filter.page_number(),
            filter.page_size(),
            total.max(0) as u64,
        ))
    }

    async fn stats(&self) -> Result<TransferStats, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_value), 0) AS value
            FROM stock_transfers
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = TransferStats::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            let status = status
                .parse::<TransferStatus>()
                .map_err(|e| DomainError::Database(sqlx::Error::Decode(e.into())))?;
            let count: i64 = row.try_get("count")?;
            let value: Decimal = row.try_get("value")?;
            stats.record(status, count.max(0) as u64, value);
        }
        Ok(stats)
    }
}
