//! API server entry point.

use std::sync::Arc;

use api::catalog::CatalogSeed;
use api::config::{Config, LogFormat};
use api::{AppState, Storage};
use stock_store::PostgresStockStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load the warehouse and item catalogs
    let seed = match &config.catalog_path {
        Some(path) => CatalogSeed::from_file(path).expect("failed to load catalog"),
        None => {
            tracing::warn!("CATALOG_PATH not set, starting with empty catalogs");
            CatalogSeed::default()
        }
    };
    tracing::info!(
        warehouses = seed.warehouses.len(),
        items = seed.items.len(),
        "catalog loaded"
    );
    let (warehouses, inventory) = seed.into_catalogs().await;

    // 4. Select storage and build application state
    let state = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to database");
            PostgresStockStore::new(pool.clone())
                .run_migrations()
                .await
                .expect("failed to run migrations");
            AppState::postgres(pool, warehouses, inventory)
        }
        None => AppState::in_memory(warehouses, inventory),
    };
    let storage: Storage = state.storage;

    // 5. Build the application
    let app = api::create_app(Arc::new(state), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, storage = storage.as_str(), "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
