//! GRBL protocol engine
//!
//! Owns the serial link and drives it from a single thread. Each iteration
//! of the communicating state runs four phases in order:
//!
//! 1. read at most one line and act on it
//! 2. apply control requests from handles
//! 3. write at most one queued outbound line
//! 4. queue a status request when the poll interval has elapsed
//!
//! Any link failure moves the engine to `Reconnecting`, which retries the
//! connection after the configured interval until it succeeds. Observers
//! learn about connectivity only when it changes.

use super::commands::MachineCommand;
use super::constants::STATUS_QUERY;
use super::error_decoder;
use super::handle::{EngineHandle, EngineSnapshot};
use super::response_parser::{classify, LineKind, ProtocolTokens};
use super::runtime::{machine_ready, InFlightCounter, RuntimeState};
use super::status_parser::parse_status;
use crate::communication::{PortDriver, SerialLink};
use olos_core::{
    thread_safe_rw, MachineEvent, MessageKind, MessageQueue, Priority, ThreadSafeRw, WriteError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Port to open; `None` tries every candidate
    pub port: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Port read/write and handshake timeout
    pub timeout: Duration,
    /// Delay between reconnection attempts
    pub reconnect_interval: Duration,
    /// Home once the controller first reports Idle
    pub home_on_start: bool,
    /// Status request interval while paused
    pub pause_poll_interval: Duration,
    /// Status request interval otherwise
    pub run_poll_interval: Duration,
    /// Status requests are skipped while the counter exceeds this
    pub max_counter_value: i64,
    /// Loop sleep while no job is streaming
    pub idle_sleep: Duration,
    /// Protocol tokens
    pub tokens: ProtocolTokens,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115200,
            timeout: Duration::from_millis(2000),
            reconnect_interval: Duration::from_millis(1000),
            home_on_start: false,
            pause_poll_interval: Duration::from_millis(1000),
            run_poll_interval: Duration::from_millis(2000),
            max_counter_value: 5,
            idle_sleep: Duration::from_millis(10),
            tokens: ProtocolTokens::default(),
        }
    }
}

/// Connection state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Not started, or stopped
    #[default]
    Disconnected,
    /// Opening the port and waiting for the handshake
    Connecting,
    /// Link up, running the protocol loop
    Communicating,
    /// Link lost, waiting to retry
    Reconnecting,
}

/// Single-threaded protocol engine; see the module docs for the loop
pub struct ProtocolEngine {
    pub(super) config: EngineConfig,
    link: SerialLink,
    state: EngineState,
    pub(super) counter: InFlightCounter,
    pub(super) runtime: RuntimeState,
    pub(super) outbound: MessageQueue<String>,
    pub(super) inbound: MessageQueue<MachineEvent>,
    commands: mpsc::UnboundedReceiver<MachineCommand>,
    snapshot: ThreadSafeRw<EngineSnapshot>,
    job_active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    last_status_request: Instant,
    reported_connection: Option<bool>,
}

impl ProtocolEngine {
    /// Create an engine and the handle used to talk to it.
    ///
    /// Nothing is opened until the first [`tick`](Self::tick).
    pub fn new(config: EngineConfig, driver: Box<dyn PortDriver>) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let outbound = MessageQueue::new();
        let inbound = MessageQueue::new();
        let snapshot = thread_safe_rw(EngineSnapshot::default());
        let job_active = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = EngineHandle::new(
            command_tx,
            outbound.clone(),
            inbound.clone(),
            Arc::clone(&snapshot),
            Arc::clone(&job_active),
            Arc::clone(&shutdown),
        );

        let engine = Self {
            link: SerialLink::new(driver, config.tokens.newline.clone()),
            config,
            state: EngineState::Disconnected,
            counter: InFlightCounter::default(),
            runtime: RuntimeState::default(),
            outbound,
            inbound,
            commands: command_rx,
            snapshot,
            job_active,
            shutdown,
            last_status_request: Instant::now(),
            reported_connection: None,
        };

        (engine, handle)
    }

    /// Run until shutdown is requested or every handle is dropped
    pub fn run(mut self) {
        tracing::info!("Protocol engine started");

        while !self.shutdown.load(Ordering::Acquire) {
            if self.commands.is_closed() {
                tracing::debug!("All engine handles dropped, shutting down");
                break;
            }
            self.tick();

            if self.state == EngineState::Communicating
                && !self.job_active.load(Ordering::Relaxed)
            {
                thread::sleep(self.config.idle_sleep);
            }
        }

        self.link.disconnect();
        self.state = EngineState::Disconnected;
        self.publish_snapshot();
        tracing::info!("Protocol engine stopped");
    }

    /// Advance the state machine by one step
    pub fn tick(&mut self) {
        match self.state {
            EngineState::Disconnected | EngineState::Connecting => self.establish(),
            EngineState::Communicating => {
                if let Err(e) = self.communicate() {
                    self.on_link_failure(e);
                }
            }
            EngineState::Reconnecting => {
                thread::sleep(self.config.reconnect_interval);
                self.establish();
            }
        }
        self.publish_snapshot();
    }

    fn establish(&mut self) {
        self.state = EngineState::Connecting;

        match self.link.connect(
            self.config.port.as_deref(),
            self.config.baud_rate,
            self.config.timeout,
        ) {
            Ok(()) => {
                self.counter.reset();
                self.last_status_request = Instant::now();
                self.state = EngineState::Communicating;
                self.report_connection(true);
            }
            Err(e) => {
                tracing::warn!("Connection attempt failed: {}", e);
                self.link.disconnect();
                self.state = EngineState::Reconnecting;
                self.report_connection(false);
            }
        }
    }

    fn communicate(&mut self) -> Result<(), WriteError> {
        if let Some(line) = self.link.read_line() {
            self.handle_line(&line);
        }

        self.apply_pending_commands();
        self.write_next()?;
        self.poll_status();

        if self.link.is_connected() {
            Ok(())
        } else {
            Err(WriteError::LinkDown)
        }
    }

    fn on_link_failure(&mut self, error: WriteError) {
        tracing::error!("Serial link failed: {}", error);
        self.link.disconnect();
        self.state = EngineState::Reconnecting;
        self.report_connection(false);
    }

    fn report_connection(&mut self, up: bool) {
        if self.reported_connection == Some(up) {
            return;
        }
        self.reported_connection = Some(up);
        self.inbound.put(
            MessageKind::Connection,
            Priority::High,
            MachineEvent::connection(up),
        );
    }

    /// Act on one received line
    pub fn handle_line(&mut self, line: &str) {
        tracing::trace!("<< {}", line);
        let kind = classify(line, &self.config.tokens);

        if kind == Ok(LineKind::Ack) {
            self.counter.acknowledged();
            return;
        }

        if self.runtime.door_open_at_start && line.starts_with(&self.config.tokens.idle_prefix) {
            self.runtime.door_open_at_start = false;
            tracing::info!("Controller reported Idle");
            if self.config.home_on_start {
                self.home();
            }
            return;
        }

        match kind {
            Ok(LineKind::Ack) => {}
            Ok(LineKind::StatusReport) => {
                self.inbound.put(
                    MessageKind::MachineStatus,
                    Priority::Mid,
                    MachineEvent::MachineStatus(parse_status(line)),
                );
            }
            Ok(LineKind::ParserState) => {
                tracing::debug!("Ignoring parser state {}", line);
            }
            Ok(LineKind::ToolChangeComplete) => {
                tracing::info!("Tool change complete");
                self.runtime.is_tool_changing = false;
                self.counter.reset();
                self.forward_line(line);
            }
            Ok(LineKind::ToolChangeFailed) => {
                tracing::error!("Tool change failed, stopping machine");
                self.stop();
                self.forward_line(line);
            }
            Ok(LineKind::SoftLimit) => {
                tracing::warn!("Soft limit triggered");
                self.counter.reset();
                self.forward_line(line);
            }
            Ok(LineKind::Message) => {
                if let Some(description) = error_decoder::describe(line) {
                    tracing::warn!("{}", description);
                }
                self.forward_line(line);
            }
            Err(e) => tracing::debug!("Discarding {}", e),
        }
    }

    fn forward_line(&self, line: &str) {
        self.inbound.put(
            MessageKind::SerialCommand,
            Priority::Low,
            MachineEvent::serial_line(line),
        );
    }

    fn apply_pending_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("All engine handles dropped, shutting down");
                    self.shutdown.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }

    fn write_next(&mut self) -> Result<(), WriteError> {
        // A failed read may have closed the port; keep the line queued.
        if !self.link.is_connected() {
            return Err(WriteError::LinkDown);
        }
        let Some(message) = self.outbound.try_get() else {
            return Ok(());
        };
        if message.payload.is_empty() {
            return Ok(());
        }

        self.link.write(&message.payload)?;
        self.counter.sent();
        if message.kind == MessageKind::ToolChange {
            self.runtime.is_tool_changing = true;
        }
        Ok(())
    }

    fn poll_status(&mut self) {
        let interval = if self.runtime.is_paused {
            self.config.pause_poll_interval
        } else {
            self.config.run_poll_interval
        };

        if self.last_status_request.elapsed() < interval {
            return;
        }
        self.last_status_request = Instant::now();

        if self.counter.value() <= self.config.max_counter_value {
            self.outbound
                .put(MessageKind::Status, Priority::Mid, STATUS_QUERY.to_string());
        } else {
            tracing::trace!(
                "Skipping status request, {} lines awaiting ok",
                self.counter.value()
            );
        }
    }

    fn publish_snapshot(&self) {
        *self.snapshot.write() = EngineSnapshot {
            state: self.state,
            connected: self.link.is_connected(),
            port: self.link.port_name().map(str::to_string),
            counter: self.counter.value(),
            runtime: self.runtime,
        };
    }

    /// Machine can accept the next line of a job
    pub fn is_ready(&self) -> bool {
        machine_ready(self.counter, &self.runtime)
    }

    /// Current connection state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current in-flight counter value
    pub fn counter(&self) -> i64 {
        self.counter.value()
    }

    /// Current runtime flags
    pub fn runtime(&self) -> RuntimeState {
        self.runtime
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("state", &self.state)
            .field("link", &self.link)
            .field("counter", &self.counter)
            .field("runtime", &self.runtime)
            .finish()
    }
}

/// Start an engine on its own thread
pub fn spawn_engine(
    config: EngineConfig,
    driver: Box<dyn PortDriver>,
) -> std::io::Result<(EngineHandle, thread::JoinHandle<()>)> {
    let (engine, handle) = ProtocolEngine::new(config, driver);
    let join = thread::Builder::new()
        .name("grbl-engine".to_string())
        .spawn(move || engine.run())?;
    Ok((handle, join))
}
