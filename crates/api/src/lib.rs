//! HTTP API server for the stock transfer engine.
//!
//! Provides REST endpoints for the transfer lifecycle, stock levels and
//! alerts, with structured logging (tracing) and Prometheus metrics. Every
//! JSON response uses the `{ success, data | error }` envelope.

pub mod catalog;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use alerts::AlertEvaluator;
use axum::Router;
use axum::routing::{get, post, put};
use domain::{
    EventSink, InMemoryInventoryCatalog, InMemoryTransferRepository, InMemoryWarehouseCatalog,
    PostgresTransferRepository, TracingEventSink, TransferRepository, TransferWorkflow,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use stock_store::{
    InMemoryStockStore, InMemoryThresholdRegistry, PostgresStockStore, PostgresThresholdRegistry,
    StockLevelStore, ThresholdRegistry,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Which backend holds transfers, stock and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Memory,
    Postgres,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Memory => "memory",
            Storage::Postgres => "postgres",
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub workflow: TransferWorkflow,
    pub alerts: AlertEvaluator,
    pub storage: Storage,
}

impl AppState {
    /// Wires every component against in-memory backends.
    pub fn in_memory(
        warehouses: InMemoryWarehouseCatalog,
        inventory: InMemoryInventoryCatalog,
    ) -> Self {
        Self::build(
            Storage::Memory,
            Arc::new(InMemoryTransferRepository::new()),
            Arc::new(InMemoryStockStore::new()),
            Arc::new(InMemoryThresholdRegistry::new()),
            warehouses,
            inventory,
        )
    }

    /// Wires every component against PostgreSQL. Migrations must already
    /// have been applied.
    pub fn postgres(
        pool: PgPool,
        warehouses: InMemoryWarehouseCatalog,
        inventory: InMemoryInventoryCatalog,
    ) -> Self {
        Self::build(
            Storage::Postgres,
            Arc::new(PostgresTransferRepository::new(pool.clone())),
            Arc::new(PostgresStockStore::new(pool.clone())),
            Arc::new(PostgresThresholdRegistry::new(pool)),
            warehouses,
            inventory,
        )
    }

    fn build(
        storage: Storage,
        repository: Arc<dyn TransferRepository>,
        stock: Arc<dyn StockLevelStore>,
        thresholds: Arc<dyn ThresholdRegistry>,
        warehouses: InMemoryWarehouseCatalog,
        inventory: InMemoryInventoryCatalog,
    ) -> Self {
        let inventory = Arc::new(inventory);
        let sink: Arc<dyn EventSink> = Arc::new(TracingEventSink);

        let alerts = AlertEvaluator::new(stock.clone(), thresholds, inventory.clone());
        let workflow =
            TransferWorkflow::new(repository, stock, Arc::new(warehouses), inventory, sink);

        Self {
            workflow,
            alerts,
            storage,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/transfers",
            post(routes::transfers::create).get(routes::transfers::list),
        )
        .route("/transfers/stats", get(routes::transfers::stats))
        .route(
            "/transfers/{id}",
            get(routes::transfers::get).delete(routes::transfers::delete),
        )
        .route("/transfers/{id}/approve", post(routes::transfers::approve))
        .route("/transfers/{id}/ship", post(routes::transfers::ship))
        .route("/transfers/{id}/receive", post(routes::transfers::receive))
        .route("/transfers/{id}/complete", post(routes::transfers::complete))
        .route("/transfers/{id}/cancel", post(routes::transfers::cancel))
        .route("/transfers/{id}/reject", post(routes::transfers::reject))
        .route("/alerts", get(routes::alerts::list_active))
        .route("/alerts/reorders", get(routes::alerts::reorders))
        .route(
            "/alerts/thresholds/{item_id}",
            get(routes::alerts::get_thresholds).put(routes::alerts::update_thresholds),
        )
        .route("/stock/items/{item_id}", get(routes::stock::by_item))
        .route(
            "/stock/warehouses/{warehouse_id}",
            get(routes::stock::by_warehouse),
        )
        .route(
            "/stock/items/{item_id}/warehouses/{warehouse_id}/location",
            put(routes::stock::set_location),
        )
        .route("/stock/receive", post(routes::stock::receive))
        .route("/stock/issue", post(routes::stock::issue))
        .route("/stock/adjust", post(routes::stock::adjust))
        .route("/stock/movements", get(routes::stock::movements))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
