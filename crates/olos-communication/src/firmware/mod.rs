//! Firmware implementations
//!
//! Supported controllers:
//! - GRBL 1.1 and compatible forks

pub mod grbl;
