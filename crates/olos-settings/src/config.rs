//! Configuration for the machine control service
//!
//! Settings are resolved once at startup from a TOML or JSON file and
//! validated before anything is opened. Every section has defaults, so a
//! file only needs the values it changes.
//!
//! Sections:
//! - Connection settings (port, baud rate, timeouts)
//! - Machine behavior on startup
//! - Status polling cadence and in-flight limits
//! - Protocol tokens emitted by the controller firmware

use crate::error::{ConfigError, ConfigResult, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Port name; empty or "auto" tries every candidate port
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read/write and handshake timeout in milliseconds
    pub timeout_ms: u64,
    /// Delay between reconnection attempts in milliseconds
    pub reconnect_interval_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115200,
            timeout_ms: 2000,
            reconnect_interval_ms: 1000,
        }
    }
}

impl ConnectionSettings {
    /// The explicitly configured port, if auto-discovery is not requested
    pub fn port_override(&self) -> Option<&str> {
        let port = self.port.trim();
        if port.is_empty() || port.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(port)
        }
    }
}

/// Machine behavior settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Run a homing cycle once the controller first reports Idle
    pub home_on_start: bool,
}

/// Status polling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Status request interval while paused, in milliseconds
    pub pause_interval_ms: u64,
    /// Status request interval while running, in milliseconds
    pub run_interval_ms: u64,
    /// No status requests are queued while more commands than this await `ok`
    pub max_counter_value: i64,
    /// Engine loop sleep when no job is streaming, in milliseconds
    pub idle_sleep_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            pause_interval_ms: 1000,
            run_interval_ms: 2000,
            max_counter_value: 5,
            idle_sleep_ms: 10,
        }
    }
}

/// Tokens of the controller wire protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Line terminator appended to every write
    pub newline: String,
    /// Acknowledgment line
    pub ack: String,
    /// Prefix of an Idle status report
    pub idle_prefix: String,
    /// Substring reported when a tool change completes
    pub tool_change_success: String,
    /// Substring reported when a tool change fails
    pub tool_change_error: String,
    /// Line reported when a soft limit trips
    pub soft_limit_trigger: String,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            newline: "\n".to_string(),
            ack: "ok".to_string(),
            idle_prefix: "<Idle".to_string(),
            tool_change_success: "TOCK".to_string(),
            tool_change_error: "TOCE".to_string(),
            soft_limit_trigger: "ALARM:2".to_string(),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Machine behavior
    pub machine: MachineSettings,
    /// Status polling
    pub polling: PollingSettings,
    /// Protocol tokens
    pub protocol: ProtocolSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location (`<config dir>/olos/config.toml`)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("olos")
            .join("config.toml")
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config from file, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            tracing::info!("Loading configuration from {}", path.display());
            Self::load_from_file(path)
        } else {
            tracing::info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        fn positive(key: &str, value: u64) -> ConfigResult<()> {
            if value == 0 {
                return Err(ConfigError::ValueOutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            Ok(())
        }

        positive("connection.baud_rate", u64::from(self.connection.baud_rate))?;
        positive("connection.timeout_ms", self.connection.timeout_ms)?;
        positive(
            "connection.reconnect_interval_ms",
            self.connection.reconnect_interval_ms,
        )?;
        positive("polling.pause_interval_ms", self.polling.pause_interval_ms)?;
        positive("polling.run_interval_ms", self.polling.run_interval_ms)?;

        if self.polling.max_counter_value < 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "polling.max_counter_value".to_string(),
                value: self.polling.max_counter_value.to_string(),
            });
        }

        let tokens = [
            ("protocol.newline", &self.protocol.newline),
            ("protocol.ack", &self.protocol.ack),
            ("protocol.idle_prefix", &self.protocol.idle_prefix),
            ("protocol.tool_change_success", &self.protocol.tool_change_success),
            ("protocol.tool_change_error", &self.protocol.tool_change_error),
            ("protocol.soft_limit_trigger", &self.protocol.soft_limit_trigger),
        ];
        for (key, token) in tokens {
            if token.is_empty() {
                return Err(ConfigError::EmptyToken(key.to_string()));
            }
        }

        // Status and parser-state frames are classified before these tokens.
        let line_tokens = [
            ("protocol.tool_change_success", &self.protocol.tool_change_success),
            ("protocol.tool_change_error", &self.protocol.tool_change_error),
            ("protocol.soft_limit_trigger", &self.protocol.soft_limit_trigger),
        ];
        for (key, token) in line_tokens {
            if token.starts_with(['<', '[']) {
                return Err(ConfigError::FramedToken(key.to_string()));
            }
        }

        Ok(())
    }
}

/// Resolve the config file path from an explicit argument, then `OLOS_CONFIG`,
/// then the platform default.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("OLOS_CONFIG").map(PathBuf::from))
        .unwrap_or_else(Config::default_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.baud_rate, 115200);
        assert_eq!(config.protocol.ack, "ok");
        assert!(!config.machine.home_on_start);
    }

    #[test]
    fn test_port_override() {
        let mut connection = ConnectionSettings::default();
        assert_eq!(connection.port_override(), None);

        connection.port = "Auto".to_string();
        assert_eq!(connection.port_override(), None);

        connection.port = " /dev/ttyACM0 ".to_string();
        assert_eq!(connection.port_override(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [connection]
            port = "/dev/ttyUSB1"

            [machine]
            home_on_start = true
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.port, "/dev/ttyUSB1");
        assert_eq!(config.connection.baud_rate, 115200);
        assert!(config.machine.home_on_start);
        assert_eq!(config.polling, PollingSettings::default());
    }

    #[test]
    fn test_validation_rejects_zero_baud() {
        let mut config = Config::default();
        config.connection.baud_rate = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ValueOutOfRange {
                key: "connection.baud_rate".to_string(),
                value: "0".to_string(),
            })
        );
    }

    #[test]
    fn test_validation_rejects_empty_token() {
        let mut config = Config::default();
        config.protocol.tool_change_success.clear();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyToken(
                "protocol.tool_change_success".to_string()
            ))
        );
    }

    #[test]
    fn test_validation_rejects_framed_token() {
        let mut config = Config::default();
        config.protocol.tool_change_success = "[TC:DONE]".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::FramedToken(
                "protocol.tool_change_success".to_string()
            ))
        );

        let mut config = Config::default();
        config.protocol.soft_limit_trigger = "<Alarm".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FramedToken(key)) if key == "protocol.soft_limit_trigger"
        ));
    }

    #[test]
    fn test_resolve_explicit_path() {
        assert_eq!(
            resolve_config_path(Some("/tmp/olos.toml")),
            PathBuf::from("/tmp/olos.toml")
        );
    }
}
