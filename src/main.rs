mod bridge;
mod config;
mod serial;
mod upload;

use bridge::Bridge;
use clap::Parser;
use config::BridgeConfig;
use serial::{SerialEvent, SerialReader};
use std::future::Future;
use std::sync::Arc;
use upload::HttpUploader;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = BridgeConfig::parse();

    info!("ESP32 RMS Current Monitor - Data Logger & API Bridge");
    info!("  Serial port: {} @ {} baud", config.serial_port, config.baud);
    info!("  API URL: {}", config.api_url);
    info!("  Standard voltage: {} V", config.voltage);

    let uploader = HttpUploader::new(config.api_url.clone())?;

    // Test API connection before starting; readings are still read if it is down
    match uploader.probe().await {
        Ok(()) => info!("API server is accessible at {}", uploader.base_url()),
        Err(e) => {
            warn!("Cannot connect to API at {}: {}", uploader.api_url(), e);
            warn!("  The bridge will continue but data won't reach the dashboard.");
        }
    }

    let mut bridge = Bridge::new(Arc::new(uploader), config.voltage);
    let mut reader = SerialReader::new(config.serial());

    info!("Waiting for data from {}...", reader.port());

    run_event_loop(&mut bridge, &mut reader, tokio::signal::ctrl_c()).await;

    info!("Total values received: {}", bridge.value_count());
    info!("Serial connection closed.");

    Ok(())
}

/// Why the event loop stopped
#[derive(Debug, PartialEq, Eq)]
enum Stop {
    Shutdown,
    ReaderClosed,
}

/// Forward serial events to the bridge until `shutdown` resolves
///
/// `shutdown` is polled across iterations, so a signal that arrives while
/// an upload is in flight is seen once that upload returns.
async fn run_event_loop<F>(bridge: &mut Bridge, reader: &mut SerialReader, shutdown: F) -> Stop
where
    F: Future,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Program terminated by user");
                return Stop::Shutdown;
            }
            event = reader.recv() => match event {
                Some(SerialEvent::Reading(current)) => {
                    bridge.handle_reading(current).await;
                }
                Some(SerialEvent::DeviceMessage(line)) => {
                    info!("ESP32: {}", line);
                }
                Some(SerialEvent::Connected { port }) => {
                    info!("[SERIAL] Connected to {}", port);
                }
                Some(SerialEvent::Disconnected { reason }) => {
                    warn!("[SERIAL] Disconnected: {}", reason);
                }
                Some(SerialEvent::ConnectionFailed { reason }) => {
                    error!("[SERIAL] Failed to open port: {}", reason);
                }
                None => {
                    error!("[SERIAL] Serial reader closed");
                    return Stop::ReaderClosed;
                }
            }
        }
    }
}
