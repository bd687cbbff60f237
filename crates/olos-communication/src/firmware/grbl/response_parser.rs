//! GRBL Response Classifier
//!
//! Decides what a received line is before the engine acts on it. The tokens
//! that mark acknowledgments, tool changes and soft limits are configurable,
//! since tool-change reporting is a firmware customization rather than stock
//! GRBL.

use olos_core::ProtocolError;

/// Protocol tokens the classifier matches against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolTokens {
    /// Line terminator appended to every write
    pub newline: String,
    /// Acknowledgment line, matched exactly
    pub ack: String,
    /// Prefix of an Idle status report
    pub idle_prefix: String,
    /// Substring reported when a tool change completes
    pub tool_change_success: String,
    /// Substring reported when a tool change fails
    pub tool_change_error: String,
    /// Line reported when a soft limit trips, matched exactly
    pub soft_limit_trigger: String,
}

impl Default for ProtocolTokens {
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

/// What a received line means to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Acknowledgment of one written line
    Ack,
    /// `<...>` status report
    StatusReport,
    /// `[...]` parser state or feedback message
    ParserState,
    /// The controller finished a tool change
    ToolChangeComplete,
    /// The controller reported a failed tool change
    ToolChangeFailed,
    /// A soft limit tripped
    SoftLimit,
    /// Anything else (startup banner, `error:N`, alarms, ...)
    Message,
}

/// Classify a trimmed line
///
/// A line that opens a `<` or `[` frame without closing it is rejected as
/// [`ProtocolError::MalformedFrame`].
pub fn classify(line: &str, tokens: &ProtocolTokens) -> Result<LineKind, ProtocolError> {
    if line == tokens.ack {
        return Ok(LineKind::Ack);
    }

    if line.starts_with('<') {
        return if line.ends_with('>') {
            Ok(LineKind::StatusReport)
        } else {
            Err(malformed(line))
        };
    }

    if line.starts_with('[') {
        return if line.ends_with(']') {
            Ok(LineKind::ParserState)
        } else {
            Err(malformed(line))
        };
    }

    if line.contains(&tokens.tool_change_success) {
        Ok(LineKind::ToolChangeComplete)
    } else if line.contains(&tokens.tool_change_error) {
        Ok(LineKind::ToolChangeFailed)
    } else if line == tokens.soft_limit_trigger {
        Ok(LineKind::SoftLimit)
    } else {
        Ok(LineKind::Message)
    }
}

fn malformed(line: &str) -> ProtocolError {
    ProtocolError::MalformedFrame {
        line: line.to_string(),
    }
}
