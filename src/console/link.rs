//! # Console Link
//!
//! Joins the synchronous [`Console`] used by the control loop to an async byte
//! stream.
//!
//! This module handles:
//! - Spawning a reader task that forwards every received byte
//! - Spawning a writer task that drains queued output
//! - Opening stdio or a serial port as the stream
//!
//! Both tasks talk to the link over unbounded channels, so reading and writing
//! from the control loop never waits.
//!
//! Stdin is read on its own OS thread rather than a runtime task. A blocked
//! stdin read cannot be cancelled, and the runtime would wait for it on
//! shutdown; a detached thread does not hold up process exit.

use std::io::Read;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::Console;
use crate::error::{Result, WheelBridgeError};

/// Default console baud rate (USB CDC links ignore it).
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial device paths tried when none is configured (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Console over an async byte stream.
pub struct ConsoleLink {
    incoming: mpsc::UnboundedReceiver<u8>,
    outgoing: mpsc::UnboundedSender<String>,
    description: String,
}

impl std::fmt::Debug for ConsoleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleLink")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl ConsoleLink {
    /// Spawns reader and writer tasks over the given halves.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R, W>(reader: R, writer: W, description: impl Into<String>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let description = description.into();
        let (in_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, out_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::pump_input(reader, in_tx, description.clone()));
        tokio::spawn(Self::pump_output(writer, out_rx, description.clone()));

        Self {
            incoming,
            outgoing,
            description,
        }
    }

    /// Like [`ConsoleLink::spawn`], but reads from a blocking reader on a
    /// dedicated thread.
    ///
    /// The thread ends at end of input, on a read error, or on the first byte
    /// received after the link is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the reader thread cannot be spawned
    pub fn spawn_blocking_reader<R, W>(reader: R, writer: W, description: impl Into<String>) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let description = description.into();
        let (in_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, out_rx) = mpsc::unbounded_channel();

        let name = description.clone();
        std::thread::Builder::new()
            .name(format!("console-{}", description))
            .spawn(move || Self::pump_blocking_input(reader, in_tx, name))?;
        tokio::spawn(Self::pump_output(writer, out_rx, description.clone()));

        Ok(Self {
            incoming,
            outgoing,
            description,
        })
    }

    /// Console on the process's stdin and stdout.
    ///
    /// # Errors
    ///
    /// Returns error if the stdin thread cannot be spawned
    pub fn stdio() -> Result<Self> {
        Self::spawn_blocking_reader(std::io::stdin(), tokio::io::stdout(), "stdio")
    }

    /// Console on the first serial device that opens.
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try in order (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns error if none of the paths can be opened
    pub fn open_serial(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial console: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened serial console at {} ({} baud)", path, baud_rate);
                    let (reader, writer) = tokio::io::split(port);
                    return Ok(Self::spawn(reader, writer, path.to_string()));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(WheelBridgeError::Serial(format!(
            "no serial console found (tried: {})",
            paths.join(", ")
        )))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| WheelBridgeError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Human-readable name of the underlying stream.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    async fn pump_input<R: AsyncRead + Unpin>(
        mut reader: R,
        tx: mpsc::UnboundedSender<u8>,
        description: String,
    ) {
        let mut buf = [0u8; 64];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    debug!("Console {} reached end of input", description);
                    break;
                }
                Ok(n) => {
                    if buf[..n].iter().any(|&byte| tx.send(byte).is_err()) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Console {} read failed: {}", description, e);
                    break;
                }
            }
        }
    }

    fn pump_blocking_input<R: Read>(mut reader: R, tx: mpsc::UnboundedSender<u8>, description: String) {
        let mut buf = [0u8; 64];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("Console {} reached end of input", description);
                    break;
                }
                Ok(n) => {
                    if buf[..n].iter().any(|&byte| tx.send(byte).is_err()) {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Console {} read failed: {}", description, e);
                    break;
                }
            }
        }
    }

    async fn pump_output<W: AsyncWrite + Unpin>(
        mut writer: W,
        mut rx: mpsc::UnboundedReceiver<String>,
        description: String,
    ) {
        while let Some(text) = rx.recv().await {
            if let Err(e) = writer.write_all(text.as_bytes()).await {
                warn!("Console {} write failed: {}", description, e);
                break;
            }
            if let Err(e) = writer.flush().await {
                warn!("Console {} flush failed: {}", description, e);
                break;
            }
        }
    }
}

impl Console for ConsoleLink {
    fn read_byte(&mut self) -> Option<u8> {
        self.incoming.try_recv().ok()
    }

    fn write_str(&mut self, text: &str) {
        if self.outgoing.send(text.to_string()).is_err() {
            debug!("Console {} output closed, dropping {} bytes", self.description, text.len());
        }
    }
}
