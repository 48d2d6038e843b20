//! JSON bodies exchanged between the meter bridge, the polling relay device,
//! the dashboard and the backend.

use crate::relay::{RelaySnapshot, RelayState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /api/relay-control`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayControlResponse {
    pub command: Option<RelayState>,
    pub status: RelayState,
}

impl From<RelaySnapshot> for RelayControlResponse {
    fn from(snapshot: RelaySnapshot) -> Self {
        Self {
            command: snapshot.command(),
            status: snapshot.relay_state,
        }
    }
}

/// Body of `POST /api/relay-control`, after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayControlRequest {
    /// The device reports what the relay is actually doing
    Status(RelayState),
    /// The dashboard asks for a new relay state
    Command(RelayState),
}

impl RelayControlRequest {
    /// Interpret a JSON body.
    ///
    /// A `status` key wins over a `command` key. Any value other than the
    /// string `"on"` normalizes to OFF. Returns `None` when neither key is
    /// present or the body is not an object.
    pub fn from_json(body: &Value) -> Option<Self> {
        let map = body.as_object()?;

        if let Some(value) = map.get("status") {
            return Some(Self::Status(normalize(value)));
        }
        if let Some(value) = map.get("command") {
            return Some(Self::Command(normalize(value)));
        }
        None
    }
}

fn normalize(value: &Value) -> RelayState {
    value
        .as_str()
        .map(RelayState::from_token)
        .unwrap_or(RelayState::Off)
}

/// A reading as uploaded by the serial bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingUpload {
    /// Power in kW
    pub power: f64,
    /// RMS current in A
    pub current: f64,
    /// Voltage in V (assumed constant)
    pub voltage: f64,
    /// ISO-8601 timestamp taken by the bridge
    pub timestamp: String,
}

/// Response to a reading upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A reading as stored and served by the backend
///
/// Fields other than `current`, `power` and `timestamp` (e.g. `voltage`,
/// `user_id`) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub current: f64,
    pub power: f64,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reading {
    /// Owner of this reading, if the uploader tagged one
    pub fn user_id(&self) -> Option<&str> {
        self.extra.get("user_id").and_then(Value::as_str)
    }
}

/// Tariff period of the Spanish 2.0TD tariff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePeriod {
    /// Off-peak, 00:00-08:00
    Valle,
    /// Shoulder
    Llano,
    /// Peak, 10:00-14:00 and 18:00-22:00
    Punta,
}

impl PricePeriod {
    /// Period for an hour of the day (0-23)
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            0..=7 => PricePeriod::Valle,
            10..=13 | 18..=21 => PricePeriod::Punta,
            _ => PricePeriod::Llano,
        }
    }
}

/// Electricity price for one hour, in €/kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub hour: u32,
    pub price: f64,
    pub date: String,
    pub period: PricePeriod,
    pub datetime: String,
}
