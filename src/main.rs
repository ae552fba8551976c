use env_logger::Builder;
use log::{info, LevelFilter};
use toolbox_admin::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    Builder::new()
        .filter_level(LevelFilter::Info) // Default to Info for everything
        .filter_module("sqlx", LevelFilter::Warn) // Suppress sqlx Debug logs
        .init();

    info!("Toolbox admin server");

    let config = AppConfig::load()?;
    info!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    toolbox_admin::run_server(&config).await
}
