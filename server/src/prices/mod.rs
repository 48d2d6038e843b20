//! Electricity price lookup
//!
//! Prices come from the REE market API when it answers, otherwise from a
//! simulated tariff curve.

pub mod fallback;
pub mod ree;

use async_trait::async_trait;
use chrono::NaiveDate;
use smartmeter_shared::wire::PricePoint;
use thiserror::Error;

pub use ree::ReeClient;

/// Hourly prices for one day
#[derive(Debug, Clone, PartialEq)]
pub struct PriceReport {
    pub points: Vec<PricePoint>,
    pub last_update: String,
}

/// Errors from an upstream price source
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("REE request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("REE API error: {0}")]
    Status(u16),

    #[error("Invalid datetime in REE response: {0}")]
    InvalidDatetime(String),

    #[error("No price data found in REE response")]
    NoPriceData,
}

/// Source of hourly electricity prices
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the prices for `date`
    async fn fetch_day(&self, date: NaiveDate) -> Result<PriceReport, PriceError>;

    /// Human-readable name for this source
    fn name(&self) -> &'static str;
}
