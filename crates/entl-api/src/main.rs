//! # entl-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the entitlement API.
//! Configuration comes from `ENTL_*` environment variables.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use entl_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("reading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(?config, "starting entitlement API");

    let port = config.port;
    let state = AppState::from_config(config).map_err(|e| {
        tracing::error!("store initialization failed: {e}");
        e
    })?;

    let app = entl_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("entitlement API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
