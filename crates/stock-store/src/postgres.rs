use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    ActorId, AlertThreshold, ItemId, MovementKind, MovementQuery, Result, StockAdjustment,
    StockLevel, StockMovement, StockStoreError, ThresholdRegistry, ThresholdUpdate, WarehouseId,
    store::{StockLevelStore, lock_order, plan_batch, record_batch_metrics, validate_adjustments},
};

/// PostgreSQL-backed stock store.
///
/// A batch runs in one transaction: missing rows are created, then every
/// involved row is locked with `SELECT ... FOR UPDATE` in key order.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_level(row: PgRow) -> Result<StockLevel> {
        Ok(StockLevel {
            item_id: ItemId::new(row.try_get("item_id")?),
            warehouse_id: WarehouseId::new(row.try_get("warehouse_id")?),
            quantity: row.try_get("quantity")?,
            location: row.try_get("location")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_movement(row: PgRow) -> Result<StockMovement> {
        let kind: String = row.try_get("kind")?;
        let kind = kind
            .parse::<MovementKind>()
            .map_err(|e| StockStoreError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(StockMovement {
            id: row.try_get("id")?,
            item_id: ItemId::new(row.try_get("item_id")?),
            warehouse_id: WarehouseId::new(row.try_get("warehouse_id")?),
            kind,
            quantity: row.try_get("quantity")?,
            resulting_quantity: row.try_get("resulting_quantity")?,
            reference: row.try_get("reference")?,
            actor: row.try_get::<Option<i64>, _>("actor_id")?.map(ActorId::new),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl StockLevelStore for PostgresStockStore {
    async fn get_quantity(&self, item_id: ItemId, warehouse_id: WarehouseId) -> Result<Decimal> {
        let quantity: Option<Decimal> = sqlx::query_scalar(
            "SELECT quantity FROM stock_levels WHERE item_id = $1 AND warehouse_id = $2",
        )
        .bind(item_id.get())
        .bind(warehouse_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(quantity.unwrap_or(Decimal::ZERO))
    }

    async fn get_aggregate_quantity(&self, item_id: ItemId) -> Result<Decimal> {
        let total: Option<Decimal> =
            sqlx::query_scalar("SELECT SUM(quantity) FROM stock_levels WHERE item_id = $1")
                .bind(item_id.get())
                .fetch_one(&self.pool)
                .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    #[tracing::instrument(skip(self, adjustments), fields(lines = adjustments.len()))]
    async fn apply(&self, adjustments: Vec<StockAdjustment>) -> Result<Vec<Decimal>> {
        validate_adjustments(&adjustments)?;

        let keys = lock_order(&adjustments);
        let mut tx = self.pool.begin().await?;

        let mut current = HashMap::with_capacity(keys.len());
        for key in &keys {
            sqlx::query(
                r#"
                INSERT INTO stock_levels (item_id, warehouse_id, quantity)
                VALUES ($1, $2, 0)
                ON CONFLICT (item_id, warehouse_id) DO NOTHING
                "#,
            )
            .bind(key.item_id.get())
            .bind(key.warehouse_id.get())
            .execute(&mut *tx)
            .await?;

            let quantity: Decimal = sqlx::query_scalar(
                r#"
                SELECT quantity FROM stock_levels
                WHERE item_id = $1 AND warehouse_id = $2
                FOR UPDATE
                "#,
            )
            .bind(key.item_id.get())
            .bind(key.warehouse_id.get())
            .fetch_one(&mut *tx)
            .await?;

            current.insert(*key, quantity);
        }

        let result = plan_batch(&adjustments, &current);
        record_batch_metrics(&result, adjustments.len());
        let quantities = match result {
            Ok(quantities) => quantities,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };

        let now = Utc::now();
        let mut last: HashMap<_, Decimal> = HashMap::with_capacity(keys.len());
        for (adjustment, quantity) in adjustments.iter().zip(&quantities) {
            last.insert(adjustment.key, *quantity);

            let movement = StockMovement::record(adjustment, *quantity);
            sqlx::query(
                r#"
                INSERT INTO stock_movements
                    (id, item_id, warehouse_id, kind, quantity, resulting_quantity, reference, actor_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(movement.id)
            .bind(movement.item_id.get())
            .bind(movement.warehouse_id.get())
            .bind(movement.kind.as_str())
            .bind(movement.quantity)
            .bind(movement.resulting_quantity)
            .bind(&movement.reference)
            .bind(movement.actor.map(|a| a.get()))
            .bind(movement.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for key in &keys {
            let Some(quantity) = last.get(key) else {
                continue;
            };
            sqlx::query(
                r#"
                UPDATE stock_levels SET quantity = $3, updated_at = $4
                WHERE item_id = $1 AND warehouse_id = $2
                "#,
            )
            .bind(key.item_id.get())
            .bind(key.warehouse_id.get())
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(lines = adjustments.len(), "stock batch applied");
        Ok(quantities)
    }

    async fn list_by_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<StockLevel>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, warehouse_id, quantity, location, updated_at
            FROM stock_levels
            WHERE warehouse_id = $1
            ORDER BY item_id ASC
            "#,
        )
        .bind(warehouse_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_level).collect()
    }

    async fn list_by_item(&self, item_id: ItemId) -> Result<Vec<StockLevel>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, warehouse_id, quantity, location, updated_at
            FROM stock_levels
            WHERE item_id = $1
            ORDER BY warehouse_id ASC
            "#,
        )
        .bind(item_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_level).collect()
    }

    async fn set_location(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        location: Option<String>,
    ) -> Result<StockLevel> {
        let row = sqlx::query(
            r#"
            INSERT INTO stock_levels (item_id, warehouse_id, quantity, location, updated_at)
            VALUES ($1, $2, 0, $3, NOW())
            ON CONFLICT (item_id, warehouse_id) DO UPDATE SET
                location = EXCLUDED.location,
                updated_at = EXCLUDED.updated_at
            RETURNING item_id, warehouse_id, quantity, location, updated_at
            "#,
        )
        .bind(item_id.get())
        .bind(warehouse_id.get())
        .bind(location)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_level(row)
    }

    async fn query_movements(&self, query: MovementQuery) -> Result<Vec<StockMovement>> {
        let mut sql = String::from(
            "SELECT id, item_id, warehouse_id, kind, quantity, resulting_quantity, reference, actor_id, created_at FROM stock_movements WHERE 1=1",
        );
        let mut param_count = 0;

        if query.item_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND item_id = ${param_count}"));
        }
        if query.warehouse_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND warehouse_id = ${param_count}"));
        }
        if query.kind.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND kind = ${param_count}"));
        }
        if query.reference.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND reference = ${param_count}"));
        }
        if query.from_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.to_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY seq DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(item_id) = query.item_id {
            sqlx_query = sqlx_query.bind(item_id.get());
        }
        if let Some(warehouse_id) = query.warehouse_id {
            sqlx_query = sqlx_query.bind(warehouse_id.get());
        }
        if let Some(kind) = query.kind {
            sqlx_query = sqlx_query.bind(kind.as_str());
        }
        if let Some(reference) = query.reference {
            sqlx_query = sqlx_query.bind(reference);
        }
        if let Some(from_ts) = query.from_timestamp {
            sqlx_query = sqlx_query.bind(from_ts);
        }
        if let Some(to_ts) = query.to_timestamp {
            sqlx_query = sqlx_query.bind(to_ts);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_movement).collect()
    }
}

/// PostgreSQL-backed threshold registry.
#[derive(Clone)]
pub struct PostgresThresholdRegistry {
    pool: PgPool,
}

impl PostgresThresholdRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_threshold(row: PgRow) -> Result<AlertThreshold> {
        Ok(AlertThreshold {
            item_id: ItemId::new(row.try_get("item_id")?),
            minimum_stock_level: row.try_get("minimum_stock_level")?,
            maximum_stock_level: row.try_get("maximum_stock_level")?,
            reorder_point: row.try_get("reorder_point")?,
            reorder_quantity: row.try_get("reorder_quantity")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ThresholdRegistry for PostgresThresholdRegistry {
    async fn get(&self, item_id: ItemId) -> Result<Option<AlertThreshold>> {
        let row = sqlx::query(
            r#"
            SELECT item_id, minimum_stock_level, maximum_stock_level, reorder_point, reorder_quantity, updated_at
            FROM alert_thresholds
            WHERE item_id = $1
            "#,
        )
        .bind(item_id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_threshold).transpose()
    }

    async fn upsert(&self, item_id: ItemId, update: ThresholdUpdate) -> Result<AlertThreshold> {
        update.validate()?;
        let threshold = update.into_threshold(item_id);

        sqlx::query(
            r#"
            INSERT INTO alert_thresholds
                (item_id, minimum_stock_level, maximum_stock_level, reorder_point, reorder_quantity, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (item_id) DO UPDATE SET
                minimum_stock_level = EXCLUDED.minimum_stock_level,
                maximum_stock_level = EXCLUDED.maximum_stock_level,
                reorder_point = EXCLUDED.reorder_point,
                reorder_quantity = EXCLUDED.reorder_quantity,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(threshold.item_id.get())
        .bind(threshold.minimum_stock_level)
        .bind(threshold.maximum_stock_level)
        .bind(threshold.reorder_point)
        .bind(threshold.reorder_quantity)
        .bind(threshold.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(threshold)
    }

    async fn list(&self) -> Result<Vec<AlertThreshold>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, minimum_stock_level, maximum_stock_level, reorder_point, reorder_quantity, updated_at
            FROM alert_thresholds
            ORDER BY item_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_threshold).collect()
    }
}
