//! Relay-control endpoints: the device polls and reports, the dashboard commands

use super::{ApiError, AppState};
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use smartmeter_shared::wire::{RelayControlRequest, RelayControlResponse};
use tracing::info;

/// `GET /api/relay-control` - polled by the device for pending commands
pub async fn get_relay_control(State(state): State<AppState>) -> Json<RelayControlResponse> {
    Json(state.relay.poll_pending().await.into())
}

/// `POST /api/relay-control` - device status report or dashboard command
pub async fn post_relay_control(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;
    info!("[API] POST /api/relay-control - Received: {}", body);

    let request = RelayControlRequest::from_json(&body).ok_or(ApiError::InvalidRequestBody)?;

    let response = match request {
        RelayControlRequest::Status(reported) => {
            let report = state.relay.report_status(reported).await;
            json!({
                "success": true,
                "status": report.relay_state,
                "message": format!("Relay status updated to {}", report.relay_state),
            })
        }
        RelayControlRequest::Command(target) => {
            let snapshot = state.relay.issue_command(target).await;
            json!({
                "success": true,
                "command": target,
                "status": snapshot.relay_state,
                "message": format!("Relay command queued: {}", target),
            })
        }
    };

    Ok(Json(response))
}
