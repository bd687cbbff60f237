//! # OLOS Communication
//!
//! Serial link to the machine controller and the GRBL protocol engine that
//! drives it. The engine runs on its own thread; the rest of the
//! application talks to it through an [`EngineHandle`].

pub mod communication;
pub mod firmware;

pub use communication::{
    list_ports, PortDriver, SerialIo, SerialLink, SerialPortInfo, SystemPortDriver,
    VirtualController, VirtualDriver,
};

pub use firmware::grbl::{
    parse_status, spawn_engine, EngineConfig, EngineHandle, EngineSnapshot, EngineState,
    MachineCommand, ProtocolEngine, ProtocolTokens, RuntimeState,
};
