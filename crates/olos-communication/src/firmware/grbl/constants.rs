//! GRBL wire commands

/// Realtime status report request
pub const STATUS_QUERY: &str = "?";

/// Run the homing cycle
pub const HOMING: &str = "$H";

/// Clear an alarm lock
pub const UNLOCK: &str = "$X";

/// Realtime feed hold
pub const FEED_HOLD: &str = "!";

/// Realtime cycle start / resume
pub const CYCLE_RESUME: &str = "~";

/// Realtime soft reset (Ctrl-X)
pub const SOFT_RESET: &str = "\u{18}";

/// Rapid move to the work origin
pub const RETURN_TO_ZERO: &str = "G90 G0 X0 Y0 Z0";

/// Make the current position the G54 work origin
pub const RESET_ZERO: &str = "G10 L20 P1 X0 Y0 Z0";

/// Relative positioning mode
pub const RELATIVE_POSITIONING: &str = "G91";

/// Absolute positioning mode
pub const ABSOLUTE_POSITIONING: &str = "G90";

/// Status line reported to observers when homing starts
pub const HOMING_STATUS: &str = "<Home>";

/// Feed move for a relative jog. `feed_per_second` is in mm/s; GRBL takes mm/min.
pub fn jog_move(x: f64, y: f64, z: f64, feed_per_second: f64) -> String {
    format!(
        "G1 X{:.3} Y{:.3} Z{:.3} F{:.0}",
        x,
        y,
        z,
        feed_per_second * 60.0
    )
}

/// Full jog sequence: switch to relative mode, move, restore absolute mode
pub fn jog_sequence(x: f64, y: f64, z: f64, feed_per_second: f64) -> [String; 3] {
    [
        RELATIVE_POSITIONING.to_string(),
        jog_move(x, y, z, feed_per_second),
        ABSOLUTE_POSITIONING.to_string(),
    ]
}
