//! GRBL Status Parser
//!
//! Turns a `<...>` status report into a [`StatusRecord`]. Each field is
//! parsed independently; a field that is missing or malformed is left as
//! `None` and never affects the others.
//!
//! Recognized fields:
//! - State (first word after `<`, substate suffix dropped)
//! - `MPos:x,y,z` machine position
//! - `WCO:x,y,z` work coordinate offset
//! - `Bf:blocks,bytes` planner buffer
//! - `FS:feed,speed` feed rate and spindle speed
//! - `Ov:feed,rapids,spindle` override percentages
//! - `T:n` active tool

use olos_core::{Axes, BufferState, FeedAndSpeed, Overrides, StatusRecord};

/// Parse a status report line. Never fails; unknown input yields an empty record.
pub fn parse_status(line: &str) -> StatusRecord {
    StatusParser::parse_full(line)
}

/// Field-level parsers for GRBL status reports
pub struct StatusParser;

impl StatusParser {
    /// Parse every recognized field of a status report
    pub fn parse_full(line: &str) -> StatusRecord {
        StatusRecord {
            state: Self::parse_state(line),
            machine_position: Self::parse_mpos(line),
            work_coordinate_offset: Self::parse_wco(line),
            buffer_state: Self::parse_buffer(line),
            feed_and_speed: Self::parse_feed_spindle(line),
            overrides: Self::parse_overrides(line),
            machine_tool: Self::parse_tool(line),
        }
    }

    /// Machine state word, e.g. `Idle` from `<Idle|...>` or `Hold` from `<Hold:0|...>`
    pub fn parse_state(line: &str) -> Option<String> {
        let rest = line.trim_start().strip_prefix('<')?;
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            None
        } else {
            Some(rest[..end].to_string())
        }
    }

    /// Parse machine position (MPos)
    pub fn parse_mpos(line: &str) -> Option<Axes> {
        Self::field(line, "MPos:").and_then(Self::parse_axes)
    }

    /// Parse work coordinate offset (WCO)
    pub fn parse_wco(line: &str) -> Option<Axes> {
        Self::field(line, "WCO:").and_then(Self::parse_axes)
    }

    /// Parse planner buffer state (Bf)
    pub fn parse_buffer(line: &str) -> Option<BufferState> {
        let [commands_queued, buffer_length] = Self::numbers(Self::field(line, "Bf:")?)?;
        Some(BufferState {
            commands_queued,
            buffer_length,
        })
    }

    /// Parse feed rate and spindle speed (FS)
    pub fn parse_feed_spindle(line: &str) -> Option<FeedAndSpeed> {
        let [feed_rate, speed] = Self::numbers(Self::field(line, "FS:")?)?;
        Some(FeedAndSpeed { feed_rate, speed })
    }

    /// Parse override percentages (Ov)
    pub fn parse_overrides(line: &str) -> Option<Overrides> {
        let [feed, rapids, spindle] = Self::numbers(Self::field(line, "Ov:")?)?;
        Some(Overrides {
            feed,
            rapids,
            spindle,
        })
    }

    /// Parse active tool number (T)
    pub fn parse_tool(line: &str) -> Option<f64> {
        let value = Self::field(line, "T:")?;
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        value.parse().ok()
    }

    fn field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
        let body = line.trim().trim_start_matches('<').trim_end_matches('>');
        body.split('|')
            .find_map(|segment| segment.trim().strip_prefix(prefix))
    }

    fn parse_axes(value: &str) -> Option<Axes> {
        let [x, y, z] = Self::numbers(value)?;
        Some(Axes::new(x, y, z))
    }

    /// First `N` comma-separated numbers; extra components (e.g. a fourth axis) are ignored
    fn numbers<const N: usize>(value: &str) -> Option<[f64; N]> {
        let mut parts = value.split(',');
        let mut out = [0.0; N];
        for slot in out.iter_mut() {
            *slot = parts.next()?.trim().parse::<f64>().ok()?;
        }
        if out.iter().all(|n| n.is_finite()) {
            Some(out)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_with_substate() {
        assert_eq!(
            StatusParser::parse_state("<Hold:0|MPos:0,0,0>"),
            Some("Hold".to_string())
        );
        assert_eq!(StatusParser::parse_state("<|MPos:0,0,0>"), None);
        assert_eq!(StatusParser::parse_state("Idle"), None);
    }

    #[test]
    fn test_four_axis_position_uses_first_three() {
        assert_eq!(
            StatusParser::parse_mpos("<Idle|MPos:1.000,2.000,3.000,4.000>"),
            Some(Axes::new(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn test_malformed_field_is_isolated() {
        let record = parse_status("<Run|MPos:1.2.3,0,0|FS:500,1000>");
        assert_eq!(record.state.as_deref(), Some("Run"));
        assert!(record.machine_position.is_none());
        assert_eq!(
            record.feed_and_speed,
            Some(FeedAndSpeed {
                feed_rate: 500.0,
                speed: 1000.0
            })
        );
    }

    #[test]
    fn test_tool_requires_integer() {
        assert_eq!(StatusParser::parse_tool("<Idle|T:2>"), Some(2.0));
        assert_eq!(StatusParser::parse_tool("<Idle|T:x>"), None);
    }
}
