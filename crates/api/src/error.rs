//! API error types with HTTP response mapping.

use alerts::AlertError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, TransferError};
use serde::Serialize;
use stock_store::StockStoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request: bad path id, query string or body.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Alert(#[from] AlertError),
    #[error(transparent)]
    Stock(#[from] StockStoreError),
}

/// Failure payload of the response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl ApiError {
    /// Returns the HTTP status and stable error kind for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Domain(err) => classify_domain(err),
            ApiError::Alert(AlertError::Domain(err)) => classify_domain(err),
            ApiError::Alert(AlertError::Stock(err)) | ApiError::Stock(err) => classify_stock(err),
            ApiError::Alert(AlertError::CostOutOfRange(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CostOutOfRange")
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let stock = match self {
            ApiError::Stock(err)
            | ApiError::Domain(DomainError::Stock(err))
            | ApiError::Alert(AlertError::Stock(err)) => err,
            _ => return None,
        };

        let shortfalls = stock.shortfalls();
        if shortfalls.is_empty() {
            return None;
        }
        serde_json::to_value(shortfalls)
            .ok()
            .map(|value| serde_json::json!({ "shortfalls": value }))
    }
}

fn classify_domain(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::Transfer(transfer_err) => match transfer_err {
            TransferError::InvalidTransfer(_) => (StatusCode::BAD_REQUEST, "InvalidTransferError"),
            TransferError::InvalidLineItem(_) => {
                (StatusCode::BAD_REQUEST, "InvalidLineItemError")
            }
            TransferError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "InvalidStateTransition")
            }
        },
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "NotFoundError"),
        DomainError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "ConcurrencyConflict"),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
        DomainError::Stock(stock_err) => classify_stock(stock_err),
        DomainError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
    }
}

fn classify_stock(err: &StockStoreError) -> (StatusCode, &'static str) {
    match err {
        StockStoreError::InsufficientStock { .. } => (StatusCode::CONFLICT, "InsufficientStock"),
        StockStoreError::InvalidAdjustment(_) => (StatusCode::BAD_REQUEST, "InvalidAdjustment"),
        StockStoreError::InvalidThreshold(_) => (StatusCode::BAD_REQUEST, "InvalidThreshold"),
        StockStoreError::Database(_) | StockStoreError::Migration(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "StorageError")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = %self, kind, "internal server error");
        } else {
            tracing::debug!(error = %self, kind, "request rejected");
        }

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                kind,
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
