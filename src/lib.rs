//! # OLOS
//!
//! Machine control service for GRBL-class CNC and laser controllers.
//!
//! ## Architecture
//!
//! OLOS is organized as a workspace with multiple crates:
//!
//! 1. **olos-core** - Errors, priority queues, status model, events
//! 2. **olos-communication** - Serial link and the GRBL protocol engine
//! 3. **olos-settings** - Configuration loading and validation
//! 4. **olos** - Main binary that wires the engine to a console transport

pub mod console;

pub use olos_communication::firmware;

pub use olos_communication::{
    list_ports, spawn_engine, EngineConfig, EngineHandle, EngineSnapshot, EngineState,
    MachineCommand, PortDriver, ProtocolTokens, SerialPortInfo, SystemPortDriver,
    VirtualController,
};

pub use olos_core::{
    Error, MachineEvent, MessageKind, MessageQueue, Priority, QueuedMessage, Result, StatusRecord,
};

pub use olos_settings::{resolve_config_path, Config};

use std::time::Duration;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Pretty output on stderr (stdout carries the event stream)
/// - RUST_LOG environment variable support, `info` by default
/// - Thread names, so engine-thread records are easy to pick out
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Resolve the engine configuration from loaded settings
pub fn engine_config(config: &Config) -> EngineConfig {
    let protocol = &config.protocol;
    EngineConfig {
        port: config.connection.port_override().map(str::to_string),
        baud_rate: config.connection.baud_rate,
        timeout: Duration::from_millis(config.connection.timeout_ms),
        reconnect_interval: Duration::from_millis(config.connection.reconnect_interval_ms),
        home_on_start: config.machine.home_on_start,
        pause_poll_interval: Duration::from_millis(config.polling.pause_interval_ms),
        run_poll_interval: Duration::from_millis(config.polling.run_interval_ms),
        max_counter_value: config.polling.max_counter_value,
        idle_sleep: Duration::from_millis(config.polling.idle_sleep_ms),
        tokens: ProtocolTokens {
            newline: protocol.newline.clone(),
            ack: protocol.ack.clone(),
            idle_prefix: protocol.idle_prefix.clone(),
            tool_change_success: protocol.tool_change_success.clone(),
            tool_change_error: protocol.tool_change_error.clone(),
            soft_limit_trigger: protocol.soft_limit_trigger.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_engine_defaults() {
        assert_eq!(engine_config(&Config::default()), EngineConfig::default());
    }

    #[test]
    fn test_explicit_port_is_kept() {
        let mut config = Config::default();
        config.connection.port = "/dev/ttyACM0".to_string();
        config.machine.home_on_start = true;

        let engine = engine_config(&config);
        assert_eq!(engine.port.as_deref(), Some("/dev/ttyACM0"));
        assert!(engine.home_on_start);
    }
}
