//! Sink abstraction so the bridge can be exercised without a backend

use async_trait::async_trait;
use smartmeter_shared::wire::ReadingUpload;
use thiserror::Error;

/// Why a reading did not reach the backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    /// Backend unreachable (not running, refused, DNS)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Backend answered with a non-success status
    #[error("API error: {0}")]
    Status(u16),

    /// Anything else (timeout, malformed response)
    #[error("{0}")]
    Other(String),
}

/// Destination for readings
#[async_trait]
pub trait ReadingSink: Send + Sync {
    /// Deliver one reading, returning the backend's acknowledgement message
    async fn send(&self, reading: &ReadingUpload) -> Result<String, UploadError>;

    /// Human-readable name for this sink
    fn name(&self) -> &'static str;
}
