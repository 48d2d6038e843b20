//! Smart Meter Shared Protocol Types
//!
//! This crate provides the relay coordination state machine, the JSON wire
//! types and the serial line codec shared by the backend server and the
//! serial bridge.

pub mod codec;
pub mod relay;
pub mod wire;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use relay::{PendingCommand, RelayCoordinator, RelaySnapshot, RelayState};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for the relay handshake
pub mod timing {
    /// A relay command expires if the device has not confirmed it within this window
    pub const COMMAND_TIMEOUT_MS: u64 = 30_000;
}

/// Electrical constants used to derive power from RMS current
pub mod electrical {
    /// Mains voltage in Portugal/Spain, assumed constant
    pub const STANDARD_VOLTAGE: f64 = 230.0;

    /// Number of readings the backend keeps in memory
    pub const MAX_READINGS: usize = 100;

    /// Power in kilowatts drawn at `current` amperes on `voltage` volts
    pub fn power_kw(current: f64, voltage: f64) -> f64 {
        (current * voltage) / 1000.0
    }

    /// Round to a fixed number of decimal places
    pub fn round_to(value: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    }
}
