//! Handle to a running protocol engine
//!
//! Handles are cheap to clone and safe to use from any thread. Control
//! requests travel to the engine over a channel and are applied between read
//! and write phases; raw lines go straight onto the outbound queue.

use super::commands::MachineCommand;
use super::engine::EngineState;
use super::runtime::{machine_ready, InFlightCounter, RuntimeState};
use olos_core::{
    EngineError, MachineEvent, MessageKind, MessageQueue, Priority, QueuedMessage, ThreadSafeRw,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Engine state as of the end of its last loop iteration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSnapshot {
    /// Connection state
    pub state: EngineState,
    /// Whether a port is open
    pub connected: bool,
    /// Name of the open port
    pub port: Option<String>,
    /// In-flight counter
    pub counter: i64,
    /// Runtime flags
    pub runtime: RuntimeState,
}

impl EngineSnapshot {
    /// Machine can accept the next line of a job
    pub fn is_ready(&self) -> bool {
        machine_ready(InFlightCounter::new(self.counter), &self.runtime)
    }
}

/// Handle for controlling and observing a [`ProtocolEngine`](super::ProtocolEngine)
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<MachineCommand>,
    outbound: MessageQueue<String>,
    inbound: MessageQueue<MachineEvent>,
    snapshot: ThreadSafeRw<EngineSnapshot>,
    job_active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(super) fn new(
        commands: mpsc::UnboundedSender<MachineCommand>,
        outbound: MessageQueue<String>,
        inbound: MessageQueue<MachineEvent>,
        snapshot: ThreadSafeRw<EngineSnapshot>,
        job_active: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            commands,
            outbound,
            inbound,
            snapshot,
            job_active,
            shutdown,
        }
    }

    /// Send a control request to the engine
    pub fn request(&self, command: MachineCommand) -> Result<(), EngineError> {
        self.commands.send(command).map_err(|_| EngineError::Stopped)
    }

    /// Drop queued work, report a Home status and run the homing cycle
    pub fn home(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::Home)
    }

    /// Drop queued work and clear an alarm lock
    pub fn unlock(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::Unlock)
    }

    /// Feed hold; polls switch to the paused interval
    pub fn pause(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::Pause)
    }

    /// Resume from feed hold
    pub fn resume(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::Resume)
    }

    /// Drop queued work and soft-reset the controller
    pub fn stop(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::Stop)
    }

    /// Rapid to the work origin
    pub fn return_to_zero(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::ReturnToZero)
    }

    /// Make the current position the work origin
    pub fn reset_zero(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::ResetZero)
    }

    /// Drop queued work and clear flags without writing anything
    pub fn reset_system(&self) -> Result<(), EngineError> {
        self.request(MachineCommand::ResetSystem)
    }

    /// Relative jog at `feed` units per second
    pub fn jog(&self, x: f64, y: f64, z: f64, feed: f64) -> Result<(), EngineError> {
        self.request(MachineCommand::Jog { x, y, z, feed })
    }

    /// Queue a line for the controller
    pub fn send_line(&self, kind: MessageKind, priority: Priority, line: impl Into<String>) {
        self.outbound.put(kind, priority, line.into());
    }

    /// Block until the engine publishes an event
    pub fn next_event(&self) -> QueuedMessage<MachineEvent> {
        self.inbound.get()
    }

    /// Next event, if one is waiting
    pub fn try_next_event(&self) -> Option<QueuedMessage<MachineEvent>> {
        self.inbound.try_get()
    }

    /// Wait up to `timeout` for the next event
    pub fn next_event_timeout(&self, timeout: Duration) -> Option<QueuedMessage<MachineEvent>> {
        self.inbound.get_timeout(timeout)
    }

    /// Latest published engine state
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.read().clone()
    }

    /// Machine can accept the next line of a job
    pub fn is_ready(&self) -> bool {
        self.snapshot.read().is_ready()
    }

    /// Whether the serial link is up
    pub fn is_connected(&self) -> bool {
        self.snapshot.read().connected
    }

    /// While a job streams, the engine loop does not sleep between iterations
    pub fn set_job_active(&self, active: bool) {
        self.job_active.store(active, Ordering::Relaxed);
    }

    /// Ask the engine thread to exit after its current iteration
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Lines waiting to be written
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }
}
