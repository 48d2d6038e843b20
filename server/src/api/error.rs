use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Request errors surfaced to HTTP callers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid request body")]
    InvalidRequestBody,

    #[error("Invalid data format. Expected current as a number.")]
    InvalidReading,

    #[error("Invalid query parameter '{name}': {value}")]
    InvalidQuery { name: &'static str, value: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson
            | ApiError::InvalidRequestBody
            | ApiError::InvalidReading
            | ApiError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Relay-control callers read `error`, the readings and prices callers read `message`
        let body = match &self {
            ApiError::InvalidJson | ApiError::InvalidRequestBody => json!({
                "success": false,
                "error": self.to_string(),
            }),
            ApiError::InvalidReading | ApiError::InvalidQuery { .. } => json!({
                "success": false,
                "message": self.to_string(),
            }),
        };

        tracing::warn!("[API] {} {}", status.as_u16(), self);

        (status, Json(body)).into_response()
    }
}
