//! Serial port access
//!
//! Provides port enumeration and the port abstraction the serial link is
//! built on. `SystemPortDriver` talks to real hardware through the
//! `serialport` crate; the virtual controller in `virtual_port` implements the
//! same traits in memory.

use olos_core::ConnectError;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

/// List serial ports that look like CNC controllers
///
/// Filters to controller-like names:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
///
/// ACM devices come first, then USB-serial adapters, then everything else,
/// so boards with native USB are tried before generic adapters.
pub fn list_ports() -> Result<Vec<SerialPortInfo>, ConnectError> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectError::Io {
            port: String::new(),
            reason: e.to_string(),
        }
    })?;

    let mut infos: Vec<SerialPortInfo> = ports
        .iter()
        .filter(|port| is_valid_cnc_port(&port.port_name))
        .map(|port| {
            let (vid, pid) = match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => (Some(usb.vid), Some(usb.pid)),
                _ => (None, None),
            };
            SerialPortInfo {
                port_name: port.port_name.clone(),
                description: get_port_description(port),
                vid,
                pid,
            }
        })
        .collect();

    infos.sort_by_key(|info| port_sort_key(&info.port_name));
    Ok(infos)
}

/// Check if a port name matches CNC controller patterns
pub fn is_valid_cnc_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (2, 0, basename.to_string())
}

fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => format!(
            "USB {} {}",
            usb_info.manufacturer.as_deref().unwrap_or("Device"),
            usb_info.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// An open byte stream to a controller
pub trait SerialIo: Read + Write + Send {
    /// Number of received bytes that can be read without blocking
    fn bytes_to_read(&self) -> io::Result<u32>;
}

/// Opens ports and enumerates candidates for auto-discovery
pub trait PortDriver: Send {
    /// Ports to try, in order
    fn candidate_ports(&self) -> Result<Vec<String>, ConnectError>;

    /// Open a port with the given baud rate and read/write timeout
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialIo>, ConnectError>;
}

/// Port driver backed by the operating system's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortDriver;

impl PortDriver for SystemPortDriver {
    fn candidate_ports(&self) -> Result<Vec<String>, ConnectError> {
        Ok(list_ports()?
            .into_iter()
            .map(|info| info.port_name)
            .collect())
    }

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialIo>, ConnectError> {
        match serialport::new(port, baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
        {
            Ok(inner) => Ok(Box::new(SystemPort { inner })),
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", port, e);
                Err(classify_open_error(port, &e))
            }
        }
    }
}

fn classify_open_error(port: &str, error: &serialport::Error) -> ConnectError {
    let busy = match error.kind() {
        serialport::ErrorKind::Io(kind) => kind == io::ErrorKind::PermissionDenied,
        serialport::ErrorKind::NoDevice => error.description.to_lowercase().contains("busy"),
        _ => false,
    };

    if busy {
        ConnectError::PortBusy {
            port: port.to_string(),
        }
    } else {
        ConnectError::Io {
            port: port.to_string(),
            reason: error.to_string(),
        }
    }
}

/// An open operating-system serial port
pub struct SystemPort {
    inner: Box<dyn serialport::SerialPort>,
}

impl Read for SystemPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SystemPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl SerialIo for SystemPort {
    fn bytes_to_read(&self) -> io::Result<u32> {
        self.inner.bytes_to_read().map_err(io::Error::from)
    }
}
