//! Line-oriented serial link to a controller
//!
//! Owns at most one open port. Writes append the configured line terminator;
//! reads return one complete, trimmed line at a time without blocking.
//! Every fatal I/O error closes the port so the caller can reconnect.

use super::serial::{PortDriver, SerialIo};
use olos_core::{ConnectError, ReadError, WriteError};
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

/// Request sent during the connection handshake
const HANDSHAKE_QUERY: &str = "?";

/// Bytes kept while waiting for a line terminator
const MAX_LINE_BYTES: usize = 1024;

/// Serial link to a single controller
pub struct SerialLink {
    driver: Box<dyn PortDriver>,
    port: Option<Box<dyn SerialIo>>,
    port_name: Option<String>,
    newline: String,
    rx_buffer: Vec<u8>,
}

impl SerialLink {
    /// Create a disconnected link that opens ports through `driver`
    pub fn new(driver: Box<dyn PortDriver>, newline: impl Into<String>) -> Self {
        Self {
            driver,
            port: None,
            port_name: None,
            newline: newline.into(),
            rx_buffer: Vec::new(),
        }
    }

    /// Open a port and confirm a controller answers on it.
    ///
    /// With an explicit `port`, only that port is tried. Otherwise every
    /// candidate reported by the driver is tried in order and the first one
    /// that answers the handshake is kept.
    pub fn connect(
        &mut self,
        port: Option<&str>,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<(), ConnectError> {
        self.disconnect();

        if let Some(name) = port {
            return self.connect_to(name, baud_rate, timeout);
        }

        let candidates = self.driver.candidate_ports()?;
        tracing::debug!("Trying {} candidate port(s)", candidates.len());
        for name in candidates {
            match self.connect_to(&name, baud_rate, timeout) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::debug!("Port {} rejected: {}", name, e),
            }
        }
        Err(ConnectError::NoDeviceFound)
    }

    fn connect_to(
        &mut self,
        name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<(), ConnectError> {
        let mut port = self.driver.open(name, baud_rate, timeout)?;
        let mut received = Vec::new();

        match handshake(&mut *port, &self.newline, timeout, &mut received) {
            Ok(true) => {
                tracing::info!("Connected to controller on {} @ {} baud", name, baud_rate);
                self.rx_buffer = received;
                self.port = Some(port);
                self.port_name = Some(name.to_string());
                Ok(())
            }
            Ok(false) => Err(ConnectError::NoDeviceFound),
            Err(e) => Err(ConnectError::Io {
                port: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Write one line, appending the line terminator.
    ///
    /// A timeout or any other failure closes the port.
    pub fn write(&mut self, line: &str) -> Result<(), WriteError> {
        let Some(port) = self.port.as_mut() else {
            return Err(WriteError::LinkDown);
        };

        let mut bytes = Vec::with_capacity(line.len() + self.newline.len());
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(self.newline.as_bytes());

        let result = port.write_all(&bytes).and_then(|()| port.flush());
        match result {
            Ok(()) => {
                tracing::trace!(">> {:?}", line);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                tracing::warn!("Write timed out: {:?}", line);
                self.disconnect();
                Err(WriteError::WriteTimeout)
            }
            Err(e) => {
                tracing::error!("Write failed: {}", e);
                self.disconnect();
                Err(WriteError::LinkDown)
            }
        }
    }

    /// Return the next complete line if one is available, without blocking.
    ///
    /// Lines are trimmed of surrounding whitespace; blank lines yield `None`.
    /// A line that is not valid UTF-8 is dropped and reported as
    /// [`ReadError::Decode`]. Fatal I/O errors close the port.
    pub fn try_read_line(&mut self) -> Result<Option<String>, ReadError> {
        if self.port.is_none() {
            return Ok(None);
        }

        if let Some(raw) = self.next_buffered_line() {
            return decode_line(raw);
        }

        match self.fill_rx_buffer() {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) if is_transient(&e) => return Ok(None),
            Err(e) => {
                tracing::error!("Read failed: {}", e);
                self.disconnect();
                return Err(ReadError::Io {
                    reason: e.to_string(),
                });
            }
        }

        match self.next_buffered_line() {
            Some(raw) => decode_line(raw),
            None => Ok(None),
        }
    }

    /// Like [`try_read_line`](Self::try_read_line), logging and discarding errors
    pub fn read_line(&mut self) -> Option<String> {
        match self.try_read_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Discarding unreadable input: {}", e);
                None
            }
        }
    }

    /// Close the port. Safe to call when already closed.
    pub fn disconnect(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(
                "Disconnected from {}",
                self.port_name.as_deref().unwrap_or("controller")
            );
        }
        self.port_name = None;
        self.rx_buffer.clear();
    }

    /// Whether a port is currently open
    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Name of the open port
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    fn fill_rx_buffer(&mut self) -> io::Result<usize> {
        let Some(port) = self.port.as_mut() else {
            return Ok(0);
        };

        let available = port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(0);
        }

        let mut chunk = vec![0u8; available];
        let count = port.read(&mut chunk)?;
        self.rx_buffer.extend_from_slice(&chunk[..count]);

        if self.rx_buffer.len() > MAX_LINE_BYTES && !self.rx_buffer.contains(&b'\n') {
            tracing::warn!(
                "Dropping {} bytes received without a line terminator",
                self.rx_buffer.len()
            );
            self.rx_buffer.clear();
        }
        Ok(count)
    }

    fn next_buffered_line(&mut self) -> Option<Vec<u8>> {
        let end = self.rx_buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.rx_buffer.drain(..=end).collect();
        line.pop();
        Some(line)
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port_name", &self.port_name)
            .field("connected", &self.port.is_some())
            .field("buffered", &self.rx_buffer.len())
            .finish()
    }
}

/// Send a status query and wait up to `timeout` for any reply line.
///
/// Bytes following the first line stay in `received` for the link to consume.
fn handshake(
    port: &mut dyn SerialIo,
    newline: &str,
    timeout: Duration,
    received: &mut Vec<u8>,
) -> io::Result<bool> {
    port.write_all(format!("{HANDSHAKE_QUERY}{newline}").as_bytes())?;
    port.flush()?;

    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; 256];
    loop {
        match port.read(&mut chunk) {
            Ok(0) => {}
            Ok(count) => received.extend_from_slice(&chunk[..count]),
            Err(e) if is_transient(&e) => {}
            Err(e) => return Err(e),
        }

        if let Some(end) = received.iter().position(|&b| b == b'\n') {
            let reply: Vec<u8> = received.drain(..=end).collect();
            if !String::from_utf8_lossy(&reply).trim().is_empty() {
                return Ok(true);
            }
            continue;
        }

        if Instant::now() >= deadline {
            // A partial reply still proves something is listening.
            return Ok(!String::from_utf8_lossy(received).trim().is_empty());
        }
        thread::sleep(Duration::from_millis(1));
    }
}

fn decode_line(raw: Vec<u8>) -> Result<Option<String>, ReadError> {
    match String::from_utf8(raw) {
        Ok(text) => {
            let line = text.trim();
            if line.is_empty() {
                Ok(None)
            } else {
                Ok(Some(line.to_string()))
            }
        }
        Err(e) => Err(ReadError::Decode {
            len: e.as_bytes().len(),
        }),
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
