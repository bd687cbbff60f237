//! In-memory controller for exercising the link and engine without hardware
//!
//! A [`VirtualController`] behaves like a GRBL board on the far end of a
//! serial cable: it records every line the host writes, answers `?` with a
//! status report and, optionally, acknowledges every line with `ok`.
//! Tests script it by pushing lines and toggling failure modes.

use super::serial::{PortDriver, SerialIo};
use olos_core::ConnectError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_STATUS_REPLY: &str = "<Idle|MPos:0.000,0.000,0.000|FS:0,0>";

#[derive(Debug)]
struct DeviceState {
    to_host: VecDeque<u8>,
    received: Vec<String>,
    partial: Vec<u8>,
    status_reply: Option<String>,
    ack_commands: bool,
    fail_writes: bool,
    offline: bool,
    opens: usize,
}

impl DeviceState {
    fn emit(&mut self, line: &str) {
        self.to_host.extend(line.as_bytes());
        self.to_host.extend(b"\r\n");
    }

    // GRBL picks realtime bytes out of the stream and then acks the empty
    // line left behind, so every line written gets an `ok`.
    fn respond(&mut self, line: &str) {
        if line == "?" {
            if let Some(reply) = self.status_reply.clone() {
                self.emit(&reply);
            }
        }
        if self.ack_commands {
            self.emit("ok");
        }
    }
}

/// Scriptable stand-in for a GRBL controller
#[derive(Debug, Clone)]
pub struct VirtualController {
    name: String,
    state: Arc<Mutex<DeviceState>>,
}

impl VirtualController {
    /// Create a controller reachable under the given port name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(DeviceState {
                to_host: VecDeque::new(),
                received: Vec::new(),
                partial: Vec::new(),
                status_reply: Some(DEFAULT_STATUS_REPLY.to_string()),
                ack_commands: true,
                fail_writes: false,
                offline: false,
                opens: 0,
            })),
        }
    }

    /// Port name this controller answers on
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A port driver that opens this controller
    pub fn driver(&self) -> VirtualDriver {
        VirtualDriver {
            controller: self.clone(),
        }
    }

    /// Queue a line for the host to read
    pub fn push_line(&self, line: &str) {
        self.state.lock().emit(line);
    }

    /// Queue raw bytes for the host to read
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state.lock().to_host.extend(bytes);
    }

    /// Every complete line written by the host so far
    pub fn sent_lines(&self) -> Vec<String> {
        self.state.lock().received.clone()
    }

    /// Take and clear the lines written by the host
    pub fn take_sent_lines(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().received)
    }

    /// Reply sent for `?`; `None` keeps the controller silent
    pub fn set_status_reply(&self, reply: Option<&str>) {
        self.state.lock().status_reply = reply.map(str::to_string);
    }

    /// Whether written lines, realtime ones included, are answered with `ok`
    pub fn set_ack_commands(&self, ack: bool) {
        self.state.lock().ack_commands = ack;
    }

    /// Make writes time out
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Simulate the cable being pulled; open ports start failing
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Number of times the port has been opened
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }
}

/// Port driver returned by [`VirtualController::driver`]
#[derive(Debug, Clone)]
pub struct VirtualDriver {
    controller: VirtualController,
}

impl PortDriver for VirtualDriver {
    fn candidate_ports(&self) -> Result<Vec<String>, ConnectError> {
        Ok(vec![self.controller.name.clone()])
    }

    fn open(
        &self,
        port: &str,
        _baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn SerialIo>, ConnectError> {
        let mut state = self.controller.state.lock();
        if port != self.controller.name || state.offline {
            return Err(ConnectError::Io {
                port: port.to_string(),
                reason: "no such device".to_string(),
            });
        }
        state.opens += 1;
        state.partial.clear();
        Ok(Box::new(VirtualPort {
            state: Arc::clone(&self.controller.state),
        }))
    }
}

struct VirtualPort {
    state: Arc<Mutex<DeviceState>>,
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected")
}

impl Read for VirtualPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(broken_pipe());
        }
        if state.to_host.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }

        let count = buf.len().min(state.to_host.len());
        for (slot, byte) in buf.iter_mut().zip(state.to_host.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl Write for VirtualPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(broken_pipe());
        }
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
        }

        state.partial.extend_from_slice(buf);
        while let Some(end) = state.partial.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = state.partial.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            state.respond(&line);
            state.received.push(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialIo for VirtualPort {
    fn bytes_to_read(&self) -> io::Result<u32> {
        let state = self.state.lock();
        if state.offline {
            return Err(broken_pipe());
        }
        Ok(state.to_host.len() as u32)
    }
}
