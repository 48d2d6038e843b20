//! Electricity prices with simulated fallback

use super::{ApiError, AppState};
use crate::prices::fallback;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub date: Option<String>,
}

/// `GET /api/electricity-prices?date=YYYY-MM-DD`
pub async fn get_prices(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = match query.date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            ApiError::InvalidQuery {
                name: "date",
                value: raw,
            }
        })?,
        None => Local::now().date_naive(),
    };
    let day = date.format("%Y-%m-%d").to_string();

    let body = match state.prices.fetch_day(date).await {
        Ok(report) => {
            info!(
                "[PRICES] Processed {} price points from {}",
                report.points.len(),
                state.prices.name()
            );
            json!({
                "success": true,
                "source": state.prices.name(),
                "data": report.points,
                "lastUpdate": report.last_update,
                "message": "Data retrieved from REE API",
            })
        }
        Err(e) => {
            warn!("[PRICES] Error fetching prices: {}. Falling back to simulated data", e);
            json!({
                "success": true,
                "source": "fallback",
                "data": fallback::generate(&day),
                "message": "Using simulated data due to API error",
                "error": e.to_string(),
            })
        }
    };

    Ok(Json(body))
}
