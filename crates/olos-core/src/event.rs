//! Inbound events
//!
//! Payloads the protocol engine publishes on the inbound queue. They are
//! serialized as flat JSON objects tagged by `type`, which is the shape the
//! web transport forwards to its clients.

use crate::data::StatusRecord;
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in the format used by event payloads
pub fn timestamp() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// Event delivered to observers of the machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineEvent {
    /// Serial link connectivity changed
    MachineConnection {
        /// Whether the link is up
        success: bool,
        /// When the change was observed
        time: String,
    },
    /// Parsed status report
    MachineStatus(StatusRecord),
    /// Any other line received from the controller
    SerialCommand {
        /// The received line
        text: String,
        /// When the line was received
        time: String,
    },
    /// Progress of a streaming job
    JobExecution {
        /// The line just sent
        text: String,
        /// Index of that line in the job
        line_index: usize,
        /// Number of lines in the job
        total_lines: usize,
        /// Elapsed job time in seconds
        file_timer: f64,
        /// When the line was sent
        time: String,
    },
}

impl MachineEvent {
    /// Connectivity event stamped with the current time
    pub fn connection(success: bool) -> Self {
        Self::MachineConnection {
            success,
            time: timestamp(),
        }
    }

    /// Received-line event stamped with the current time
    pub fn serial_line(text: impl Into<String>) -> Self {
        Self::SerialCommand {
            text: text.into(),
            time: timestamp(),
        }
    }

    /// Job progress event stamped with the current time
    pub fn job_progress(
        text: impl Into<String>,
        line_index: usize,
        total_lines: usize,
        file_timer: f64,
    ) -> Self {
        Self::JobExecution {
            text: text.into(),
            line_index,
            total_lines,
            file_timer,
            time: timestamp(),
        }
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Axes, FeedAndSpeed};

    #[test]
    fn test_connection_json() {
        let json: serde_json::Value =
            serde_json::from_str(&MachineEvent::connection(true).to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "machine_connection");
        assert_eq!(json["success"], true);
        assert_eq!(json["time"].as_str().map(str::len), Some(19));
    }

    #[test]
    fn test_status_json_is_flat() {
        let event = MachineEvent::MachineStatus(StatusRecord {
            state: Some("Run".to_string()),
            machine_position: Some(Axes::new(10.0, 0.0, -5.0)),
            feed_and_speed: Some(FeedAndSpeed {
                feed_rate: 500.0,
                speed: 1000.0,
            }),
            ..Default::default()
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "machine_status");
        assert_eq!(json["state"], "Run");
        assert_eq!(json["machine_position"]["z"], -5.0);
        assert_eq!(json["feed_and_speed"]["speed"], 1000.0);
    }

    #[test]
    fn test_round_trip_serial_line() {
        let event = MachineEvent::serial_line("Grbl 1.1h ['$' for help]");
        let back: MachineEvent = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(back, event);
    }
}
