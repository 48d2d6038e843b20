//! Turns RMS readings into uploads and reports how each one went

use crate::upload::{ReadingSink, UploadError};
use chrono::Local;
use smartmeter_shared::electrical::{power_kw, round_to};
use smartmeter_shared::wire::ReadingUpload;
use std::sync::Arc;
use tracing::{info, warn};

/// Connection failures are only reported on every Nth reading
const CONNECTION_ERROR_EVERY: u64 = 10;

/// What happened to one reading
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Accepted { message: String },
    Failed(UploadError),
}

pub struct Bridge {
    sink: Arc<dyn ReadingSink>,
    voltage: f64,
    value_count: u64,
}

impl Bridge {
    pub fn new(sink: Arc<dyn ReadingSink>, voltage: f64) -> Self {
        Self {
            sink,
            voltage,
            value_count: 0,
        }
    }

    /// Readings received so far
    pub fn value_count(&self) -> u64 {
        self.value_count
    }

    /// Build the upload body for a reading taken now
    pub fn build_upload(&self, current: f64) -> ReadingUpload {
        ReadingUpload {
            power: round_to(power_kw(current, self.voltage), 4),
            current: round_to(current, 4),
            voltage: self.voltage,
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }

    /// Count, upload and log one RMS current reading
    pub async fn handle_reading(&mut self, current: f64) -> Delivery {
        self.value_count += 1;
        let count = self.value_count;
        let upload = self.build_upload(current);
        let power = power_kw(current, self.voltage);

        let summary = format!(
            "#{:4} | RMS Current: {:.4} A | Power: {:.4} kW",
            count, current, power
        );

        match self.sink.send(&upload).await {
            Ok(message) => {
                info!("{} | ✓ API: {}", summary, message);
                Delivery::Accepted { message }
            }
            Err(e) => {
                match self.failure_note(&e, count) {
                    Some(note) => warn!("{} | {}", summary, note),
                    None => info!("{}", summary),
                }
                Delivery::Failed(e)
            }
        }
    }

    /// Text appended to the reading's log line for a failed upload, if any
    fn failure_note(&self, error: &UploadError, count: u64) -> Option<String> {
        match error {
            UploadError::Connection(_) if count % CONNECTION_ERROR_EVERY == 1 => {
                Some("✗ API: Connection failed - Is the server running?".into())
            }
            UploadError::Connection(_) => None,
            UploadError::Status(code) => Some(format!("✗ API Error: {}", code)),
            UploadError::Other(_) => {
                let text = error.to_string();
                Some(format!(
                    "✗ {}: {}",
                    self.sink.name(),
                    text.chars().take(50).collect::<String>()
                ))
            }
        }
    }
}
