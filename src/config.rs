//! Bridge configuration

use clap::Parser;
use smartmeter_shared::electrical::STANDARD_VOLTAGE;
use std::time::Duration;

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/arduino-data";

/// Relay RMS current readings from the meter's serial port to the backend
#[derive(Debug, Clone, Parser)]
#[command(name = "serial-bridge", about = "ESP32 RMS current monitor - data logger & API bridge")]
pub struct BridgeConfig {
    /// Serial port the ESP32 is connected to
    #[arg(long = "port", env = "SERIAL_PORT", default_value = DEFAULT_SERIAL_PORT)]
    pub serial_port: String,

    /// Baud rate (must match the firmware's Serial.begin())
    #[arg(long, env = "SERIAL_BAUD", default_value_t = 115_200)]
    pub baud: u32,

    /// Endpoint readings are POSTed to
    #[arg(long, env = "METER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Mains voltage used to derive power
    #[arg(long, default_value_t = STANDARD_VOLTAGE)]
    pub voltage: f64,
}

impl BridgeConfig {
    pub fn serial(&self) -> SerialConfig {
        SerialConfig {
            port: self.serial_port.clone(),
            baud: self.baud,
            ..Default::default()
        }
    }
}

/// Configuration for the serial reader
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path (e.g. "/dev/ttyUSB0" or "COM8")
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Time the ESP32 needs after the port opens (it resets on connect)
    pub init_delay: Duration,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.into(),
            baud: 115_200,
            init_delay: Duration::from_secs(2),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}
