//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::response::ApiResponse;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health: returns system health status.
pub async fn check(State(state): State<Arc<AppState>>) -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        storage: state.storage.as_str(),
    })
}
