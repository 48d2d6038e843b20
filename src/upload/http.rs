//! HTTP upload to the backend's readings endpoint

use super::traits::{ReadingSink, UploadError};
use async_trait::async_trait;
use smartmeter_shared::wire::{IngestResponse, ReadingUpload};
use std::time::Duration;

/// Per-request timeout for uploads and the startup probe
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(2);

/// POSTs readings as JSON to the backend
pub struct HttpUploader {
    client: reqwest::Client,
    api_url: String,
}

impl HttpUploader {
    pub fn new(api_url: impl Into<String>) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| UploadError::Other(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Base of the API, used to check the backend is up
    pub fn base_url(&self) -> String {
        self.api_url.replace("/arduino-data", "")
    }

    /// Check whether the backend answers at all; any HTTP response counts
    pub async fn probe(&self) -> Result<(), UploadError> {
        self.client
            .get(self.base_url())
            .send()
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> UploadError {
    if e.is_connect() {
        UploadError::Connection(e.to_string())
    } else {
        UploadError::Other(e.to_string())
    }
}

#[async_trait]
impl ReadingSink for HttpUploader {
    async fn send(&self, reading: &ReadingUpload) -> Result<String, UploadError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(reading)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        // The backend's message is informational; a success without one is still a success
        let message = response
            .json::<IngestResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| "OK".into());

        Ok(message)
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let uploader = HttpUploader::new("http://localhost:5000/api/arduino-data").unwrap();
        assert_eq!(uploader.base_url(), "http://localhost:5000/api");
        assert_eq!(uploader.name(), "HTTP");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_error() {
        // Port 9 (discard) is essentially never listening on loopback
        let uploader = HttpUploader::new("http://127.0.0.1:9/api/arduino-data").unwrap();
        let reading = ReadingUpload {
            power: 0.23,
            current: 1.0,
            voltage: 230.0,
            timestamp: "2024-01-15T14:30:25".into(),
        };

        assert!(matches!(
            uploader.send(&reading).await,
            Err(UploadError::Connection(_))
        ));
    }
}
