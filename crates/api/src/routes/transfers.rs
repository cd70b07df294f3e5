//! Transfer lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use common::{ActorId, TransferId};
use domain::{CreateTransfer, Page, StockTransfer, TransferFilter, TransferStats};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::response::ApiResponse;

/// Body of every transition request.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub actor_id: ActorId,
    /// Only read by cancel and reject.
    #[serde(default)]
    pub reason: Option<String>,
}

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// POST /transfers: create a transfer in `pending`.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTransfer>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let Json(cmd) = body?;
    let transfer = state.workflow.create(cmd).await?;
    Ok(ApiResponse::created(transfer))
}

/// GET /transfers: filtered, paginated listing, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TransferFilter>, QueryRejection>,
) -> ApiResult<Page<StockTransfer>> {
    let Query(filter) = query?;
    Ok(ApiResponse::ok(state.workflow.list(filter).await?))
}

/// GET /transfers/stats: counts by status.
#[tracing::instrument(skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<TransferStats> {
    Ok(ApiResponse::ok(state.workflow.stats().await?))
}

/// GET /transfers/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StockTransfer> {
    let transfer_id = parse_transfer_id(&id)?;
    Ok(ApiResponse::ok(state.workflow.get(transfer_id).await?))
}

/// DELETE /transfers/{id}: only while `pending` or `approved`.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StockTransfer> {
    let transfer_id = parse_transfer_id(&id)?;
    Ok(ApiResponse::ok(state.workflow.delete(transfer_id).await?))
}

/// POST /transfers/{id}/approve
#[tracing::instrument(skip(state, body))]
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let (transfer_id, req) = parse_transition(&id, body)?;
    Ok(ApiResponse::ok(
        state.workflow.approve(transfer_id, req.actor_id).await?,
    ))
}

/// POST /transfers/{id}/ship: draws stock from the source warehouse.
#[tracing::instrument(skip(state, body))]
pub async fn ship(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let (transfer_id, req) = parse_transition(&id, body)?;
    Ok(ApiResponse::ok(
        state.workflow.ship(transfer_id, req.actor_id).await?,
    ))
}

/// POST /transfers/{id}/receive: credits the destination warehouse.
#[tracing::instrument(skip(state, body))]
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let (transfer_id, req) = parse_transition(&id, body)?;
    Ok(ApiResponse::ok(
        state.workflow.receive(transfer_id, req.actor_id).await?,
    ))
}

/// POST /transfers/{id}/complete
#[tracing::instrument(skip(state, body))]
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let (transfer_id, req) = parse_transition(&id, body)?;
    Ok(ApiResponse::ok(
        state.workflow.complete(transfer_id, req.actor_id).await?,
    ))
}

/// POST /transfers/{id}/cancel
#[tracing::instrument(skip(state, body))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let (transfer_id, req) = parse_transition(&id, body)?;
    Ok(ApiResponse::ok(
        state
            .workflow
            .cancel(transfer_id, req.actor_id, req.reason)
            .await?,
    ))
}

/// POST /transfers/{id}/reject
#[tracing::instrument(skip(state, body))]
pub async fn reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<StockTransfer> {
    let (transfer_id, req) = parse_transition(&id, body)?;
    Ok(ApiResponse::ok(
        state
            .workflow
            .reject(transfer_id, req.actor_id, req.reason)
            .await?,
    ))
}

fn parse_transition(
    id: &str,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<(TransferId, TransitionRequest), ApiError> {
    let transfer_id = parse_transfer_id(id)?;
    let Json(req) = body?;
    Ok((transfer_id, req))
}

fn parse_transfer_id(id: &str) -> Result<TransferId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid transfer id: {e}")))
}
