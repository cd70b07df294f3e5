//! Stock alert and reorder endpoints.

use std::sync::Arc;

use alerts::{ReorderSuggestion, StockAlert};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::ItemId;
use stock_store::{AlertThreshold, ThresholdUpdate};

use crate::AppState;
use crate::error::ApiError;
use crate::response::ApiResponse;

/// GET /alerts: low and out-of-stock items, most severe first.
#[tracing::instrument(skip(state))]
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<StockAlert>>, ApiError> {
    Ok(ApiResponse::ok(state.alerts.list_active_alerts().await?))
}

/// GET /alerts/reorders
#[tracing::instrument(skip(state))]
pub async fn reorders(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<ReorderSuggestion>>, ApiError> {
    Ok(ApiResponse::ok(state.alerts.suggest_reorders().await?))
}

/// GET /alerts/thresholds/{item_id}: 404 when the item has none configured.
#[tracing::instrument(skip(state))]
pub async fn get_thresholds(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<ApiResponse<AlertThreshold>, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let threshold = state.alerts.get_thresholds(item_id).await?.ok_or_else(|| {
        ApiError::from(domain::DomainError::not_found("AlertThreshold", item_id))
    })?;
    Ok(ApiResponse::ok(threshold))
}

/// PUT /alerts/thresholds/{item_id}
#[tracing::instrument(skip(state, body))]
pub async fn update_thresholds(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    body: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> Result<ApiResponse<AlertThreshold>, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let Json(update) = body?;
    Ok(ApiResponse::ok(
        state.alerts.update_thresholds(item_id, update).await?,
    ))
}

pub(crate) fn parse_item_id(id: &str) -> Result<ItemId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))
}
