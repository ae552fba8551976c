pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use logic::{
    BulkError, BulkOperationExecutor, BulkOutcome, Notice, NoticeLevel, OperationResult, RecordObserver, Strategy,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api::handlers::AppContext;
use crate::config::AppConfig;
use crate::logic::AuditLog;

/// Build the admin application around `store`
pub fn build_app<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> axum::Router {
    let context = Arc::new(AppContext::new(store, Arc::new(AuditLog), config.admin.clone()));
    let router = api::routes::create_router::<S>();
    api::routes::with_assets(router, config.admin.assets_dir.as_deref()).with_state(context)
}

async fn prepare<S: Store + 'static>(store: S, config: &AppConfig) -> anyhow::Result<axum::Router> {
    let store = Arc::new(store);

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
        log::info!("Seed data loaded successfully");
    }

    Ok(build_app(store, config))
}

/// Connect storage per configuration and return the ready router
pub async fn app_from_config(config: &AppConfig) -> anyhow::Result<axum::Router> {
    if config.database.in_memory {
        log::info!("Using the in-memory store");
        return prepare(MemoryStore::new(), config).await;
    }

    log::info!("Connecting to PostgreSQL...");
    let database_url = config.database_url()?;
    let postgres_store = PostgresStore::new(&database_url, config.max_connections()).await?;

    log::info!("Running database migrations...");
    postgres_store.migrate().await?;

    prepare(postgres_store, config).await
}

/// Bind the configured address and serve until the process stops
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Toolbox admin running on http://{}", bind_address);

    serve_on(listener, config).await
}

/// Serve the configured application on an already bound listener
pub async fn serve_on(listener: TcpListener, config: &AppConfig) -> anyhow::Result<()> {
    let app = app_from_config(config).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
