//! Serial link to the ESP32 current monitor

mod reader;

pub use reader::{SerialEvent, SerialReader};
