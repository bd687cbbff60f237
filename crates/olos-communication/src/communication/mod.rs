//! Communication with the controller over a serial line

pub mod link;
pub mod serial;
pub mod virtual_port;

pub use link::SerialLink;
pub use serial::{list_ports, PortDriver, SerialIo, SerialPortInfo, SystemPortDriver};
pub use virtual_port::{VirtualController, VirtualDriver};
