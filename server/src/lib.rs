//! Smart meter backend
//!
//! Receives readings from the serial bridge, coordinates the relay between
//! the dashboard and the polling device, and serves electricity prices.

pub mod api;
pub mod command;
pub mod config;
pub mod prices;
pub mod readings;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

pub use api::{create_app, AppState};
pub use config::ServerConfig;

/// Bind and serve until Ctrl+C
pub async fn run(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = create_app(state);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server listening on {}", listener.local_addr()?);
    info!("  Relay command timeout: {}s", config.command_timeout_secs);
    info!("  Endpoints:");
    info!("    POST /api/arduino-data      (bridge sends readings)");
    info!("    GET  /api/arduino-data      (dashboard gets readings)");
    info!("    GET  /api/relay-control     (device polls for commands)");
    info!("    POST /api/relay-control     (dashboard commands / device reports)");
    info!("    GET  /api/electricity-prices");
    info!("    GET  /health");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
