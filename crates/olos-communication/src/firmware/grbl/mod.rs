//! GRBL firmware support
//!
//! Status parsing, line classification and the protocol engine that keeps a
//! GRBL controller connected and fed.

pub mod commands;
pub mod constants;
pub mod engine;
pub mod error_decoder;
pub mod handle;
pub mod response_parser;
pub mod runtime;
pub mod status_parser;

pub use commands::MachineCommand;
pub use engine::{spawn_engine, EngineConfig, EngineState, ProtocolEngine};
pub use handle::{EngineHandle, EngineSnapshot};
pub use response_parser::{classify, LineKind, ProtocolTokens};
pub use runtime::{machine_ready, InFlightCounter, RuntimeState, COUNTER_RESET};
pub use status_parser::{parse_status, StatusParser};
