//! Serial reader with automatic reconnection

use crate::config::SerialConfig;
use anyhow::{anyhow, Result};
use smartmeter_shared::codec::{classify_line, CodecError, LineDecoder, SerialLine};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt};
use tracing::{debug, warn};

/// Events emitted by the serial reader
#[derive(Debug, Clone, PartialEq)]
pub enum SerialEvent {
    /// Port opened and ready
    Connected { port: String },
    /// Port lost after being open
    Disconnected { reason: String },
    /// Port could not be opened
    ConnectionFailed { reason: String },
    /// RMS current reading in amperes
    Reading(f64),
    /// Banner or status line printed by the firmware
    DeviceMessage(String),
}

/// Owns the serial connection loop and hands out its events
pub struct SerialReader {
    config: SerialConfig,
    event_rx: mpsc::Receiver<SerialEvent>,
}

impl SerialReader {
    /// Create a serial reader and start the connection loop
    pub fn new(config: SerialConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<SerialEvent>(100);

        let config_clone = config.clone();
        tokio::spawn(async move {
            connection_loop(config_clone, event_tx).await;
        });

        Self { config, event_rx }
    }

    /// Wrap an existing event channel without opening a port
    #[cfg(test)]
    pub(crate) fn from_receiver(config: SerialConfig, event_rx: mpsc::Receiver<SerialEvent>) -> Self {
        Self { config, event_rx }
    }

    /// Receive the next serial event
    pub async fn recv(&mut self) -> Option<SerialEvent> {
        self.event_rx.recv().await
    }

    /// Get the configured port path
    pub fn port(&self) -> &str {
        &self.config.port
    }
}

/// Main connection loop with reconnection logic
async fn connection_loop(config: SerialConfig, event_tx: mpsc::Sender<SerialEvent>) {
    let mut reconnect_delay = config.reconnect_delay;

    loop {
        match tokio_serial::new(&config.port, config.baud).open_native_async() {
            Ok(port) => {
                // The ESP32 resets when the port opens; wait for it and drop the boot noise
                tokio::time::sleep(config.init_delay).await;
                if let Err(e) = port.clear(ClearBuffer::Input) {
                    warn!("[SERIAL] Could not clear input buffer: {}", e);
                }

                reconnect_delay = config.reconnect_delay; // Reset delay

                if event_tx
                    .send(SerialEvent::Connected {
                        port: config.port.clone(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }

                if let Err(reason) = read_lines(port, &event_tx).await {
                    if event_tx
                        .send(SerialEvent::Disconnected {
                            reason: reason.to_string(),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Err(e) => {
                if event_tx
                    .send(SerialEvent::ConnectionFailed {
                        reason: format!("{}: {}", config.port, e),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        // Wait before reconnecting
        tokio::time::sleep(reconnect_delay).await;

        // Exponential backoff
        reconnect_delay = std::cmp::min(reconnect_delay * 2, config.max_reconnect_delay);
    }
}

/// Read from an open port, forwarding readings and device messages.
///
/// Returns when the port closes or errors, or when nobody is listening anymore.
async fn read_lines<R>(mut reader: R, event_tx: &mpsc::Sender<SerialEvent>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = LineDecoder::new();
    let mut read_buf = vec![0u8; 1024];

    loop {
        let n = reader.read(&mut read_buf).await?;
        if n == 0 {
            return Err(anyhow!("Serial port closed"));
        }
        decoder.extend(&read_buf[..n]);

        // Process all complete lines
        loop {
            let line = match decoder.decode_next() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(CodecError::InvalidUtf8) => continue, // corrupted bytes, skip the line
                Err(e) => {
                    debug!("[SERIAL] Dropped line: {}", e);
                    continue;
                }
            };

            let event = match classify_line(&line) {
                SerialLine::Reading(current) => SerialEvent::Reading(current),
                SerialLine::DeviceMessage(text) => SerialEvent::DeviceMessage(text),
                SerialLine::Ignored => continue,
            };

            if event_tx.send(event).await.is_err() {
                return Ok(());
            }
        }
    }
}
