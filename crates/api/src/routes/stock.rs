//! Stock level, direct movement and ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{ActorId, ItemId, WarehouseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_store::{MovementKind, MovementQuery, StockLevel, StockMovement};

use crate::AppState;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::routes::alerts::parse_item_id;

const DEFAULT_MOVEMENT_LIMIT: usize = 50;
const MAX_MOVEMENT_LIMIT: usize = 500;

/// Body of `/stock/receive` and `/stock/issue`.
#[derive(Debug, Deserialize)]
pub struct StockMovementRequest {
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    /// Must be positive.
    pub quantity: Decimal,
    pub actor_id: ActorId,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Body of `/stock/adjust`.
#[derive(Debug, Deserialize)]
pub struct StockAdjustRequest {
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    /// Signed correction.
    pub delta: Decimal,
    pub actor_id: ActorId,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockQuantityResponse {
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    pub quantity: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ItemStockResponse {
    pub item_id: ItemId,
    pub aggregate_quantity: Decimal,
    pub levels: Vec<StockLevel>,
}

/// Body of the location update.
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    /// Bin or shelf label; `null` clears it.
    pub location: Option<String>,
}

/// Query string of `/stock/movements`.
#[derive(Debug, Default, Deserialize)]
pub struct MovementParams {
    pub item_id: Option<ItemId>,
    pub warehouse_id: Option<WarehouseId>,
    pub kind: Option<MovementKind>,
    pub reference: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl MovementParams {
    fn into_query(self) -> MovementQuery {
        let mut query = MovementQuery::new()
            .limit(
                self.limit
                    .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
                    .clamp(1, MAX_MOVEMENT_LIMIT),
            )
            .offset(self.offset.unwrap_or(0));
        query.item_id = self.item_id;
        query.warehouse_id = self.warehouse_id;
        query.kind = self.kind;
        query.reference = self.reference;
        query.from_timestamp = self.from;
        query.to_timestamp = self.to;
        query
    }
}

/// GET /stock/items/{item_id}: per-warehouse levels plus the aggregate.
#[tracing::instrument(skip(state))]
pub async fn by_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<ApiResponse<ItemStockResponse>, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let stock = state.workflow.stock();

    let levels = stock.list_by_item(item_id).await?;
    let aggregate_quantity = stock.get_aggregate_quantity(item_id).await?;

    Ok(ApiResponse::ok(ItemStockResponse {
        item_id,
        aggregate_quantity,
        levels,
    }))
}

/// GET /stock/warehouses/{warehouse_id}
#[tracing::instrument(skip(state))]
pub async fn by_warehouse(
    State(state): State<Arc<AppState>>,
    Path(warehouse_id): Path<String>,
) -> Result<ApiResponse<Vec<StockLevel>>, ApiError> {
    let warehouse_id = parse_warehouse_id(&warehouse_id)?;
    Ok(ApiResponse::ok(
        state.workflow.stock().list_by_warehouse(warehouse_id).await?,
    ))
}

/// PUT /stock/items/{item_id}/warehouses/{warehouse_id}/location
#[tracing::instrument(skip(state, body))]
pub async fn set_location(
    State(state): State<Arc<AppState>>,
    Path((item_id, warehouse_id)): Path<(String, String)>,
    body: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<ApiResponse<StockLevel>, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let warehouse_id = parse_warehouse_id(&warehouse_id)?;
    let Json(req) = body?;
    Ok(ApiResponse::ok(
        state
            .workflow
            .set_location(item_id, warehouse_id, req.location)
            .await?,
    ))
}

/// POST /stock/receive: goods arriving outside of a transfer.
#[tracing::instrument(skip(state, body))]
pub async fn receive(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StockMovementRequest>, JsonRejection>,
) -> Result<ApiResponse<StockQuantityResponse>, ApiError> {
    let Json(req) = body?;
    let quantity = state
        .workflow
        .receive_stock(
            req.item_id,
            req.warehouse_id,
            req.quantity,
            req.actor_id,
            req.reference,
        )
        .await?;
    Ok(ApiResponse::ok(StockQuantityResponse {
        item_id: req.item_id,
        warehouse_id: req.warehouse_id,
        quantity,
    }))
}

/// POST /stock/issue: goods leaving outside of a transfer.
#[tracing::instrument(skip(state, body))]
pub async fn issue(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StockMovementRequest>, JsonRejection>,
) -> Result<ApiResponse<StockQuantityResponse>, ApiError> {
    let Json(req) = body?;
    let quantity = state
        .workflow
        .issue_stock(
            req.item_id,
            req.warehouse_id,
            req.quantity,
            req.actor_id,
            req.reference,
        )
        .await?;
    Ok(ApiResponse::ok(StockQuantityResponse {
        item_id: req.item_id,
        warehouse_id: req.warehouse_id,
        quantity,
    }))
}

/// POST /stock/adjust: manual correction by a signed delta.
#[tracing::instrument(skip(state, body))]
pub async fn adjust(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StockAdjustRequest>, JsonRejection>,
) -> Result<ApiResponse<StockQuantityResponse>, ApiError> {
    let Json(req) = body?;
    let quantity = state
        .workflow
        .adjust_stock(
            req.item_id,
            req.warehouse_id,
            req.delta,
            req.actor_id,
            req.reference,
        )
        .await?;
    Ok(ApiResponse::ok(StockQuantityResponse {
        item_id: req.item_id,
        warehouse_id: req.warehouse_id,
        quantity,
    }))
}

/// GET /stock/movements: the ledger, newest first.
#[tracing::instrument(skip(state, params))]
pub async fn movements(
    State(state): State<Arc<AppState>>,
    params: Result<Query<MovementParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<StockMovement>>, ApiError> {
    let Query(params) = params?;
    Ok(ApiResponse::ok(
        state
            .workflow
            .stock()
            .query_movements(params.into_query())
            .await?,
    ))
}

fn parse_warehouse_id(id: &str) -> Result<WarehouseId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid warehouse id: {e}")))
}
