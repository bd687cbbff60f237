//! Firmware-layer integration tests

mod grbl;
