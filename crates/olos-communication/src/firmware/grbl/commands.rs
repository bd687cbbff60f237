//! Machine commands
//!
//! Each command enqueues its wire lines on the outbound queue and updates the
//! runtime flags. Realtime commands go out at high priority so they overtake
//! anything already queued.

use super::constants::{
    jog_sequence, CYCLE_RESUME, FEED_HOLD, HOMING, HOMING_STATUS, RESET_ZERO, RETURN_TO_ZERO,
    SOFT_RESET, STATUS_QUERY, UNLOCK,
};
use super::engine::ProtocolEngine;
use super::status_parser::parse_status;
use olos_core::{MachineEvent, MessageKind, Priority};

/// Control request sent from a handle to the engine thread
#[derive(Debug, Clone, PartialEq)]
pub enum MachineCommand {
    /// Discard queued work and run the homing cycle
    Home,
    /// Discard queued work and clear an alarm lock
    Unlock,
    /// Feed hold
    Pause,
    /// Resume from feed hold
    Resume,
    /// Soft reset, discarding queued work
    Stop,
    /// Rapid to the work origin
    ReturnToZero,
    /// Make the current position the work origin
    ResetZero,
    /// Relative jog; `feed` is in units per second
    Jog { x: f64, y: f64, z: f64, feed: f64 },
    /// Discard queued work and clear flags without sending anything
    ResetSystem,
}

impl ProtocolEngine {
    /// Apply a control request
    pub fn apply(&mut self, command: MachineCommand) {
        tracing::debug!("Applying {:?}", command);
        match command {
            MachineCommand::Home => self.home(),
            MachineCommand::Unlock => self.unlock(),
            MachineCommand::Pause => self.pause(),
            MachineCommand::Resume => self.resume(),
            MachineCommand::Stop => self.stop(),
            MachineCommand::ReturnToZero => self.return_to_zero(),
            MachineCommand::ResetZero => self.reset_zero(),
            MachineCommand::Jog { x, y, z, feed } => self.jog(x, y, z, feed),
            MachineCommand::ResetSystem => self.reset_system(),
        }
    }

    /// Clear flags, reset the counter and empty both queues
    pub fn reset_system(&mut self) {
        self.runtime.reset();
        self.counter.reset();
        let dropped_out = self.outbound.drain().len();
        let dropped_in = self.inbound.drain().len();
        if dropped_out + dropped_in > 0 {
            tracing::debug!(
                "Reset dropped {} outbound and {} inbound message(s)",
                dropped_out,
                dropped_in
            );
        }
    }

    /// Reset, report a Home status and start the homing cycle
    pub fn home(&mut self) {
        tracing::info!("Homing");
        self.reset_system();
        self.inbound.put(
            MessageKind::MachineStatus,
            Priority::Mid,
            MachineEvent::MachineStatus(parse_status(HOMING_STATUS)),
        );
        self.outbound
            .put(MessageKind::Normal, Priority::Mid, HOMING.to_string());
    }

    /// Reset, then clear an alarm lock
    pub fn unlock(&mut self) {
        self.reset_system();
        self.outbound
            .put(MessageKind::Normal, Priority::Mid, UNLOCK.to_string());
    }

    /// Feed hold, followed by a status request
    pub fn pause(&mut self) {
        self.runtime.is_paused = true;
        self.outbound
            .put(MessageKind::RealTime, Priority::High, FEED_HOLD.to_string());
        self.outbound
            .put(MessageKind::Status, Priority::Mid, STATUS_QUERY.to_string());
    }

    /// Resume from feed hold
    pub fn resume(&mut self) {
        self.runtime.is_paused = false;
        self.outbound
            .put(MessageKind::RealTime, Priority::High, CYCLE_RESUME.to_string());
    }

    /// Reset, then soft-reset the controller
    pub fn stop(&mut self) {
        tracing::warn!("Stopping machine");
        self.reset_system();
        self.outbound
            .put(MessageKind::RealTime, Priority::High, SOFT_RESET.to_string());
    }

    /// Rapid to the work origin
    pub fn return_to_zero(&mut self) {
        self.outbound
            .put(MessageKind::Normal, Priority::Mid, RETURN_TO_ZERO.to_string());
    }

    /// Make the current position the work origin
    pub fn reset_zero(&mut self) {
        self.counter.reset();
        self.outbound
            .put(MessageKind::Normal, Priority::Mid, RESET_ZERO.to_string());
    }

    /// Relative jog at `feed` units per second
    pub fn jog(&mut self, x: f64, y: f64, z: f64, feed: f64) {
        for line in jog_sequence(x, y, z, feed) {
            self.outbound.put(MessageKind::Normal, Priority::Mid, line);
        }
    }

    /// Queue an arbitrary line
    pub fn send_line(&mut self, kind: MessageKind, priority: Priority, line: impl Into<String>) {
        self.outbound.put(kind, priority, line.into());
    }
}
