//! # OLOS Core
//!
//! Core types shared by the machine control service.
//! Provides the error taxonomy, the priority message queues that connect the
//! protocol engine to the rest of the application, the parsed status data
//! model, and the JSON event payloads delivered to observers.

pub mod data;
pub mod error;
pub mod event;
pub mod queue;
pub mod types;

pub use data::{Axes, BufferState, FeedAndSpeed, Overrides, StatusRecord};

pub use error::{ConnectError, EngineError, Error, ProtocolError, ReadError, Result, WriteError};

pub use event::{timestamp, MachineEvent};

pub use queue::{MessageKind, MessageQueue, Priority, QueuedMessage};

pub use types::{thread_safe_rw, ThreadSafeRw};
