//! HTTP routes

mod error;
pub mod health;
pub mod prices;
pub mod readings;
pub mod relay;

pub use error::ApiError;

use crate::command::RelayDispatcher;
use crate::config::ServerConfig;
use crate::prices::{PriceError, PriceSource, ReeClient};
use crate::readings::ReadingStore;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayDispatcher>,
    pub readings: Arc<ReadingStore>,
    pub prices: Arc<dyn PriceSource>,
}

impl AppState {
    /// Build the production services from configuration
    pub fn from_config(config: &ServerConfig) -> Result<Self, PriceError> {
        let prices = ReeClient::new(config.ree_url.clone(), config.ree_timeout())?;

        Ok(Self {
            relay: Arc::new(RelayDispatcher::new(config.command_timeout())),
            readings: Arc::new(ReadingStore::new(config.max_readings)),
            prices: Arc::new(prices),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/arduino-data",
            get(readings::get_readings).post(readings::post_reading),
        )
        .route(
            "/api/relay-control",
            get(relay::get_relay_control).post(relay::post_relay_control),
        )
        .route("/api/electricity-prices", get(prices::get_prices))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
