use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod host;
mod routes;

use crate::config::{Config, LoggingConfig};
use crate::routes::{AppState, router};

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},tower_http={level},ras_identity_goto={level}",
            level = logging.level.to_lowercase()
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.to_lowercase().as_str() {
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(&config.logging);
    info!("Starting GoTo login demo");

    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path),
        None => debug!("No config file found, using environment only"),
    }
    for warning in config.warnings() {
        warn!("{}", warning);
    }

    let state = AppState::from_config(&config)?;
    info!(
        "GoTo callback URL: {}{}",
        config.server.public_url.trim_end_matches('/'),
        config.goto.callback_path
    );

    let app = router(state);

    let bind_addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
