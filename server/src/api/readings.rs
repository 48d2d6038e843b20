//! Meter reading ingestion and query

use super::{ApiError, AppState};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use smartmeter_shared::electrical::{power_kw, STANDARD_VOLTAGE};
use smartmeter_shared::wire::{IngestResponse, Reading};
use tracing::info;

/// Readings returned when no limit is given
const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub limit: Option<String>,
    pub user_id: Option<String>,
}

/// `POST /api/arduino-data` - a new reading from the serial bridge
pub async fn post_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(&body) else {
        return Err(ApiError::InvalidReading);
    };

    let current = fields
        .remove("current")
        .and_then(|v| v.as_f64())
        .ok_or(ApiError::InvalidReading)?;

    // Power and timestamp are always derived server-side
    fields.remove("power");
    fields.remove("timestamp");

    let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    let reading = Reading {
        current,
        power: power_kw(current, STANDARD_VOLTAGE),
        timestamp: timestamp.clone(),
        extra: fields,
    };
    let power = reading.power;

    let total = state.readings.push(reading).await;
    info!(
        "[API] Data stored: current={}, power={}, total={}",
        current, power, total
    );

    Ok(Json(IngestResponse {
        success: true,
        message: "Data received successfully".into(),
        timestamp: Some(timestamp),
    }))
}

/// `GET /api/arduino-data?limit=&user_id=` - most recent readings
pub async fn get_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = match query.limit {
        Some(raw) => raw.parse::<usize>().map_err(|_| ApiError::InvalidQuery {
            name: "limit",
            value: raw,
        })?,
        None => DEFAULT_LIMIT,
    };

    // An empty user_id means no filter
    let user_id = query.user_id.as_deref().filter(|id| !id.is_empty());
    let readings = state.readings.recent(limit, user_id).await;

    info!(
        "[API] GET /api/arduino-data: Returning {} readings (total: {})",
        readings.len(),
        state.readings.count().await
    );

    Ok(Json(json!({
        "success": true,
        "count": readings.len(),
        "data": readings,
        "message": "Recent readings retrieved successfully",
    })))
}
