//! Flow-control counter and runtime flags of the attached machine

/// Counter value right after a reset
pub const COUNTER_RESET: i64 = -1;

/// Approximate number of written lines still awaiting `ok`.
///
/// Incremented on every successful write and decremented on every
/// acknowledgment. Realtime bytes are written as lines too; GRBL consumes
/// the byte and acks the empty line that remains, so they balance like any
/// other write. Homing, stop, tool-change completion and soft-limit
/// recovery reset it. A surplus `ok` may drive it below the reset value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightCounter(i64);

impl InFlightCounter {
    /// Counter starting at `value`
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Return to the reset value
    pub fn reset(&mut self) {
        self.0 = COUNTER_RESET;
    }

    /// Record a written line
    pub fn sent(&mut self) {
        self.0 += 1;
    }

    /// Record an acknowledgment
    pub fn acknowledged(&mut self) {
        self.0 -= 1;
    }

    /// Current value
    pub fn value(self) -> i64 {
        self.0
    }

    /// No written line is awaiting acknowledgment
    pub fn is_drained(self) -> bool {
        self.0 <= 0
    }
}

impl Default for InFlightCounter {
    fn default() -> Self {
        Self(COUNTER_RESET)
    }
}

/// Flags tracking what the machine is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeState {
    /// A feed hold is in effect
    pub is_paused: bool,
    /// A tool change is in progress
    pub is_tool_changing: bool,
    /// No Idle report has been seen since the engine started
    pub door_open_at_start: bool,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            is_paused: false,
            is_tool_changing: false,
            door_open_at_start: true,
        }
    }
}

impl RuntimeState {
    /// Clear pause and tool-change flags. The start-up door flag is kept.
    pub fn reset(&mut self) {
        self.is_paused = false;
        self.is_tool_changing = false;
    }
}

/// Whether the machine can take the next line of a job
pub fn machine_ready(counter: InFlightCounter, runtime: &RuntimeState) -> bool {
    counter.is_drained() && !runtime.is_tool_changing && !runtime.is_paused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_balances_acknowledgments() {
        let mut counter = InFlightCounter::new(0);
        for _ in 0..4 {
            counter.sent();
        }
        for _ in 0..4 {
            counter.acknowledged();
        }
        assert_eq!(counter.value(), 0);

        counter.acknowledged();
        assert_eq!(counter.value(), -1);
        assert!(counter.is_drained());
    }

    #[test]
    fn test_reset_clears_flags_except_door() {
        let mut runtime = RuntimeState {
            is_paused: true,
            is_tool_changing: true,
            door_open_at_start: true,
        };
        runtime.reset();
        assert!(!runtime.is_paused);
        assert!(!runtime.is_tool_changing);
        assert!(runtime.door_open_at_start);
    }

    #[test]
    fn test_ready_truth_table() {
        let cases = [
            // counter, tool_changing, paused, ready
            (-1, false, false, true),
            (0, false, false, true),
            (1, false, false, false),
            (0, true, false, false),
            (0, false, true, false),
            (-1, true, true, false),
            (3, true, true, false),
        ];

        for (value, tool, paused, expected) in cases {
            let runtime = RuntimeState {
                is_paused: paused,
                is_tool_changing: tool,
                door_open_at_start: false,
            };
            assert_eq!(
                machine_ready(InFlightCounter::new(value), &runtime),
                expected,
                "counter={value} tool={tool} paused={paused}"
            );
        }
    }
}
