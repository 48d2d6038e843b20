use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use meter_server::command::RelayDispatcher;
use meter_server::prices::{PriceError, PriceReport, PriceSource};
use meter_server::readings::ReadingStore;
use meter_server::{create_app, AppState};
use smartmeter_shared::wire::{PricePeriod, PricePoint};

/// Price source that always answers with one fixed point
pub struct StaticPrices;

#[async_trait]
impl PriceSource for StaticPrices {
    async fn fetch_day(&self, date: NaiveDate) -> Result<PriceReport, PriceError> {
        let day = date.format("%Y-%m-%d").to_string();
        Ok(PriceReport {
            points: vec![PricePoint {
                hour: 12,
                price: 0.151,
                date: day.clone(),
                period: PricePeriod::Punta,
                datetime: format!("{day}T12:00:00.000+01:00"),
            }],
            last_update: "2024-01-15T20:00:00.000+01:00".into(),
        })
    }

    fn name(&self) -> &'static str {
        "ree"
    }
}

/// Price source that is always down
pub struct FailingPrices;

#[async_trait]
impl PriceSource for FailingPrices {
    async fn fetch_day(&self, _date: NaiveDate) -> Result<PriceReport, PriceError> {
        Err(PriceError::Status(503))
    }

    fn name(&self) -> &'static str {
        "ree"
    }
}

pub struct MockApp {
    pub router: Router,
}

impl MockApp {
    pub fn new() -> Self {
        Self::with(Duration::from_secs(30), Arc::new(StaticPrices))
    }

    pub fn with(command_timeout: Duration, prices: Arc<dyn PriceSource>) -> Self {
        let state = AppState {
            relay: Arc::new(RelayDispatcher::new(command_timeout)),
            readings: Arc::new(ReadingStore::new(100)),
            prices,
        };

        Self {
            router: create_app(state),
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}
