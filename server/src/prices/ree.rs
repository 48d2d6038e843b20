//! Client for the Red Eléctrica (REE) real-time market price API

use super::{PriceError, PriceReport, PriceSource};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Timelike};
use reqwest::header::ACCEPT;
use serde_json::Value;
use smartmeter_shared::electrical::round_to;
use smartmeter_shared::wire::{PricePeriod, PricePoint};
use std::time::Duration;
use tracing::debug;

/// Peninsular electric system
const GEO_ID: &str = "8741";

/// Fetches PVPC prices from REE
pub struct ReeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReeClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PriceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PriceSource for ReeClient {
    async fn fetch_day(&self, date: NaiveDate) -> Result<PriceReport, PriceError> {
        let day = date.format("%Y-%m-%d").to_string();
        let start_date = format!("{day}T00:00");
        let end_date = format!("{day}T23:59");

        debug!("[PRICES] Fetching REE data for date: {}", day);

        let response = self
            .client
            .get(&self.base_url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
                ("time_trunc", "hour"),
                ("geo_trunc", "electric_system"),
                ("geo_limit", "peninsular"),
                ("geo_ids", GEO_ID),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PriceError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        parse_response(&body, &day)
    }

    fn name(&self) -> &'static str {
        "ree"
    }
}

/// Whether an `included[]` entry carries prices
fn is_price_indicator(indicator: &Value) -> bool {
    let attribute = |key: &str| {
        indicator
            .pointer(&format!("/attributes/{key}"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };

    let title = attribute("title");
    let magnitude = attribute("magnitude");

    ["pvpc", "precio", "price"].iter().any(|k| title.contains(k))
        || ["€/mwh", "euro", "mwh"].iter().any(|k| magnitude.contains(k))
}

/// Turn an REE response body into hourly €/kWh prices for `date`
pub fn parse_response(body: &Value, date: &str) -> Result<PriceReport, PriceError> {
    let values = body
        .get("included")
        .and_then(Value::as_array)
        .and_then(|included| included.iter().find(|i| is_price_indicator(i)))
        .and_then(|indicator| indicator.pointer("/attributes/values"))
        .and_then(Value::as_array)
        .ok_or(PriceError::NoPriceData)?;

    let mut points = Vec::with_capacity(values.len());

    for value in values {
        let Some(datetime) = value.get("datetime").and_then(Value::as_str) else {
            continue;
        };
        // Zero and missing values are gaps in the series
        let price_mwh = value.get("value").and_then(Value::as_f64).unwrap_or(0.0);
        if datetime.is_empty() || price_mwh == 0.0 {
            continue;
        }

        let hour = DateTime::parse_from_rfc3339(datetime)
            .map_err(|_| PriceError::InvalidDatetime(datetime.to_string()))?
            .hour();

        points.push(PricePoint {
            hour,
            price: round_to(price_mwh / 1000.0, 3),
            date: date.to_string(),
            period: PricePeriod::for_hour(hour),
            datetime: datetime.to_string(),
        });
    }

    if points.is_empty() {
        return Err(PriceError::NoPriceData);
    }

    points.sort_by_key(|p| p.hour);

    let last_update = body
        .pointer("/data/attributes/last-update")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Local::now().to_rfc3339());

    Ok(PriceReport {
        points,
        last_update,
    })
}
