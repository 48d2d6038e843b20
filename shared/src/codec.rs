//! Newline-delimited codec for the meter's serial output
//!
//! The microcontroller prints human-readable lines such as:
//! ```text
//! ADS1115 CT RMS Monitor
//! I_RMS_avg_5s (A): 0.0016
//! ```
//!
//! [`LineDecoder`] splits the raw byte stream into lines and
//! [`classify_line`] extracts RMS current readings from them.

use bytes::{Buf, BytesMut};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Longest line accepted before the buffer is discarded
pub const MAX_LINE_LEN: usize = 1024;

/// Marker the firmware prints in front of each 5 s RMS average
pub const RMS_MARKER: &str = "I_RMS_avg_5s";

static RMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"I_RMS_avg_5s \(A\):\s*([-+]?\d+\.\d+)").expect("valid RMS pattern")
});

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+\.\d+").expect("valid decimal pattern"));

/// Errors that can occur while splitting lines
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Line too long: {0} bytes without newline (max: {MAX_LINE_LEN})")]
    LineTooLong(usize),

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
}

/// Try to decode one newline-terminated line from a buffer
///
/// Returns:
/// - `Ok(Some(line))` with trailing whitespace removed
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the line was dropped; the bad bytes are consumed
///
/// An unterminated line over [`MAX_LINE_LEN`] is cleared here, but the rest
/// of it is only skipped by [`LineDecoder`], which remembers the overflow.
pub fn decode(buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
    let Some(pos) = find_newline(buf) else {
        if buf.len() > MAX_LINE_LEN {
            let len = buf.len();
            buf.clear();
            return Err(CodecError::LineTooLong(len));
        }
        return Ok(None);
    };

    if pos > MAX_LINE_LEN {
        buf.advance(pos + 1);
        return Err(CodecError::LineTooLong(pos));
    }

    let line = buf.split_to(pos);
    buf.advance(1);

    match std::str::from_utf8(&line) {
        Ok(text) => Ok(Some(text.trim_end().to_string())),
        Err(_) => Err(CodecError::InvalidUtf8),
    }
}

fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Streaming line decoder
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Partial line data being accumulated
    buffer: BytesMut,
    /// Skipping the tail of an over-long line up to its newline
    discarding: bool,
}

impl LineDecoder {
    /// Create a new line decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_LINE_LEN),
            discarding: false,
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next line from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)`; an `Err` only drops
    /// the offending line and decoding can continue.
    pub fn decode_next(&mut self) -> Result<Option<String>, CodecError> {
        if self.discarding {
            let Some(pos) = find_newline(&self.buffer) else {
                self.buffer.clear();
                return Ok(None);
            };
            self.buffer.advance(pos + 1);
            self.discarding = false;
        }

        if find_newline(&self.buffer).is_none() && self.buffer.len() > MAX_LINE_LEN {
            let len = self.buffer.len();
            self.buffer.clear();
            self.discarding = true;
            return Err(CodecError::LineTooLong(len));
        }

        decode(&mut self.buffer)
    }

    /// Discard anything buffered (e.g. stale data after reconnect)
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

/// What a single serial line carries
#[derive(Debug, Clone, PartialEq)]
pub enum SerialLine {
    /// RMS current in amperes
    Reading(f64),
    /// Firmware banner or sampling notice worth showing to the operator
    DeviceMessage(String),
    /// Anything else
    Ignored,
}

/// Classify a trimmed serial line
pub fn classify_line(line: &str) -> SerialLine {
    if line.is_empty() {
        return SerialLine::Ignored;
    }

    if line.contains(RMS_MARKER) {
        // Fall back to any decimal if the firmware changes its label format
        let value = RMS_PATTERN
            .captures(line)
            .and_then(|caps| caps.get(1))
            .or_else(|| DECIMAL_PATTERN.find(line))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        return match value {
            Some(current) => SerialLine::Reading(current),
            None => SerialLine::Ignored,
        };
    }

    if line.contains("ADS1115") || line.contains("Sampling") {
        return SerialLine::DeviceMessage(line.to_string());
    }

    SerialLine::Ignored
}
