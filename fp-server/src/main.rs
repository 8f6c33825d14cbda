//! FleetPlayback Server
//!
//! Route playback server with REST API, SSE event stream and GPS report dispatch

use anyhow::{Context, Result};
use fp_server::{api, config::ServerConfig, manager, state};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting FleetPlayback Server");

    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Create application state
    let state = state::AppState::with_config(&config)?;

    // Build the router
    let app = api::create_router(state.clone());

    // Start report dispatcher in background
    tokio::spawn(manager::run(state.clone()));

    // Start server
    info!("Server listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
