//! Status data model
//!
//! Immutable values produced from a single controller status report. Every
//! field is optional: controllers only report what changed or what their
//! report mask enables, and partial telemetry is still valid telemetry.

use serde::{Deserialize, Serialize};

/// Three-axis coordinate triple
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    /// X axis
    pub x: f64,
    /// Y axis
    pub y: f64,
    /// Z axis
    pub z: f64,
}

impl Axes {
    /// Create a coordinate triple
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Sub for Axes {
    type Output = Axes;

    fn sub(self, rhs: Axes) -> Axes {
        Axes::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Planner/serial buffer occupancy (`Bf:`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferState {
    /// Blocks available in the planner buffer
    pub commands_queued: f64,
    /// Bytes available in the serial receive buffer
    pub buffer_length: f64,
}

/// Current feed rate and spindle speed (`FS:`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedAndSpeed {
    /// Feed rate in units per minute
    pub feed_rate: f64,
    /// Spindle speed or laser power
    pub speed: f64,
}

/// Override percentages (`Ov:`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    /// Feed override percentage
    pub feed: f64,
    /// Rapid override percentage
    pub rapids: f64,
    /// Spindle override percentage
    pub spindle: f64,
}

/// Serde adapter writing a missing group as an object whose leaves are all
/// `null`, so consumers can always index into it. Reading accepts either
/// form and yields `None` unless every leaf is present.
macro_rules! null_leaf_group {
    ($module:ident, $group:ident { $($field:ident),+ }) => {
        mod $module {
            use super::$group;
            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            #[derive(Default, Serialize, Deserialize)]
            struct Leaves {
                $($field: Option<f64>,)+
            }

            pub fn serialize<S: Serializer>(
                value: &Option<$group>,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                let leaves = match value {
                    Some(group) => Leaves { $($field: Some(group.$field),)+ },
                    None => Leaves::default(),
                };
                leaves.serialize(serializer)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Option<$group>, D::Error> {
                let leaves = Option::<Leaves>::deserialize(deserializer)?;
                Ok(leaves.and_then(|leaves| Some($group { $($field: leaves.$field?,)+ })))
            }
        }
    };
}

null_leaf_group!(axes_leaves, Axes { x, y, z });
null_leaf_group!(buffer_leaves, BufferState { commands_queued, buffer_length });
null_leaf_group!(feed_leaves, FeedAndSpeed { feed_rate, speed });
null_leaf_group!(override_leaves, Overrides { feed, rapids, spindle });

/// One parsed status report
///
/// Missing groups serialize as objects with `null` leaves, never as a bare
/// `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Machine state name (Idle, Run, Hold, Alarm, Door, Home, ...)
    pub state: Option<String>,
    /// Machine position (`MPos:`)
    #[serde(default, with = "axes_leaves")]
    pub machine_position: Option<Axes>,
    /// Work coordinate offset (`WCO:`)
    #[serde(default, with = "axes_leaves")]
    pub work_coordinate_offset: Option<Axes>,
    /// Buffer state (`Bf:`)
    #[serde(default, with = "buffer_leaves")]
    pub buffer_state: Option<BufferState>,
    /// Feed and speed (`FS:`)
    #[serde(default, with = "feed_leaves")]
    pub feed_and_speed: Option<FeedAndSpeed>,
    /// Overrides (`Ov:`)
    #[serde(default, with = "override_leaves")]
    pub overrides: Option<Overrides>,
    /// Active tool (`T:`)
    pub machine_tool: Option<f64>,
}

impl StatusRecord {
    /// Work position derived as `MPos - WCO` when both are known
    pub fn work_position(&self) -> Option<Axes> {
        match (self.machine_position, self.work_coordinate_offset) {
            (Some(mpos), Some(wco)) => Some(mpos - wco),
            _ => None,
        }
    }

    /// Check the reported state name
    pub fn is_state(&self, name: &str) -> bool {
        self.state.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_position() {
        let record = StatusRecord {
            machine_position: Some(Axes::new(10.0, 5.0, -1.0)),
            work_coordinate_offset: Some(Axes::new(2.0, 1.0, -1.0)),
            ..Default::default()
        };
        assert_eq!(record.work_position(), Some(Axes::new(8.0, 4.0, 0.0)));

        let partial = StatusRecord {
            machine_position: Some(Axes::new(1.0, 1.0, 1.0)),
            ..Default::default()
        };
        assert_eq!(partial.work_position(), None);
    }

    #[test]
    fn test_absent_groups_serialize_with_null_leaves() {
        let record = StatusRecord {
            state: Some("Idle".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "Idle");
        assert_eq!(
            json["machine_position"],
            serde_json::json!({"x": null, "y": null, "z": null})
        );
        assert!(json["buffer_state"]["buffer_length"].is_null());
        assert!(json["feed_and_speed"]["feed_rate"].is_null());
        assert!(json["overrides"]["spindle"].is_null());
        assert!(json["machine_tool"].is_null());
    }

    #[test]
    fn test_null_leaf_groups_read_back_as_absent() {
        let record = StatusRecord {
            state: Some("Run".to_string()),
            machine_position: Some(Axes::new(1.0, 2.0, 3.0)),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(serde_json::from_str::<StatusRecord>(&json).unwrap(), record);

        let bare: StatusRecord =
            serde_json::from_str(r#"{"state":"Idle","overrides":null}"#).unwrap();
        assert_eq!(bare.overrides, None);
        assert_eq!(bare.machine_position, None);
    }
}
