//! OLOS Settings Crate
//!
//! Typed configuration for the machine control service: connection
//! parameters, startup behavior, status polling cadence and protocol tokens.

pub mod config;
pub mod error;

pub use config::{
    resolve_config_path, Config, ConnectionSettings, MachineSettings, PollingSettings,
    ProtocolSettings,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
