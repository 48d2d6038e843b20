use super::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API server is running",
        "readings_count": state.readings.count().await,
        "relay_state": state.relay.relay_state().await,
    }))
}
