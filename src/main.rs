//! druid-panel API Server
//!
//! Run with: cargo run --bin druid-panel
//!
//! # Configuration
//!
//! Read from `config.toml` in the default locations, then overridden by:
//! - `DRUID_PANEL_ENGINE_URL`: Broker query endpoint
//! - `DRUID_PANEL_ENGINE_TIMEOUT_SECS`: Per-query timeout
//! - `DRUID_PANEL_API_HOST` / `DRUID_PANEL_API_PORT`: Bind address
//! - `DRUID_PANEL_LOG_LEVEL` / `DRUID_PANEL_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Overrides the log filter entirely

use druid_panel::api::{serve, AppState};
use druid_panel::config::{Config, LoggingConfig};
use druid_panel::engine::{HttpEngine, QueryEngine};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_with_env(std::path::Path::new(&path))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting druid-panel API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Query engine: {}", config.engine.url);

    let engine = Arc::new(HttpEngine::new(&config.engine)?);

    match engine.health_check().await {
        Ok(()) => tracing::info!("Query engine connection verified"),
        Err(e) => tracing::warn!("Query engine not available: {} (queries will fail until it is)", e),
    }

    let state = AppState::new(engine, config.api.clone());
    serve(state, &config.api).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("druid_panel={},tower_http=debug", logging.level).into()
    });

    match logging.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}
