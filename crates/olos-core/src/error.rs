//! Error handling for OLOS
//!
//! Provides the error types for every layer of the machine link:
//! - Connection errors (port discovery, handshake, opening)
//! - Write errors (sending a line to the controller)
//! - Read errors (non-fatal, degrade to "no data")
//! - Protocol errors (malformed frames, discarded)
//! - Engine errors (the engine thread is gone)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Raised while establishing the serial link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// No candidate port answered the handshake
    #[error("No GRBL device found")]
    NoDeviceFound,

    /// The port exists but another process holds it
    #[error("Port busy: {port}")]
    PortBusy {
        /// The name of the busy port.
        port: String,
    },

    /// OS-level failure while opening or probing a port
    #[error("I/O error on {port}: {reason}")]
    Io {
        /// The port being opened, or empty when enumerating.
        port: String,
        /// The reason reported by the OS.
        reason: String,
    },
}

/// Write error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The controller did not accept the bytes within the port timeout
    #[error("Write operation timed out")]
    WriteTimeout,

    /// There is no open port to write to
    #[error("Serial link is down")]
    LinkDown,
}

/// Read error type
///
/// Never fatal to the engine: reads that fail are logged and treated as
/// "no data" for that poll.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The received line was not valid UTF-8 and was dropped
    #[error("Dropped undecodable line ({len} bytes)")]
    Decode {
        /// Length of the dropped line in bytes.
        len: usize,
    },

    /// The port reported an I/O failure
    #[error("Read failed: {reason}")]
    Io {
        /// The reason reported by the OS.
        reason: String,
    },
}

/// Protocol error type
///
/// Unexpected frames are discarded, never raised to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A bracketed frame that was opened but never closed
    #[error("Malformed frame: {line}")]
    MalformedFrame {
        /// The offending line.
        line: String,
    },
}

/// Engine error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The protocol engine thread has exited and no longer accepts requests
    #[error("Protocol engine stopped")]
    Stopped,
}

/// Main error type for OLOS
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Write error
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Read error
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error means the serial link has to be re-established
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Error::Connect(_) | Error::Write(_) | Error::Io(_)
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConnectError::PortBusy {
            port: "/dev/ttyUSB0".to_string(),
        };
        assert_eq!(err.to_string(), "Port busy: /dev/ttyUSB0");
        assert_eq!(WriteError::WriteTimeout.to_string(), "Write operation timed out");
        assert_eq!(
            ReadError::Decode { len: 4 }.to_string(),
            "Dropped undecodable line (4 bytes)"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = WriteError::LinkDown.into();
        assert!(err.is_link_failure());

        let err: Error = ConnectError::NoDeviceFound.into();
        assert!(err.is_link_failure());

        let err: Error = ProtocolError::MalformedFrame {
            line: "<Idle".to_string(),
        }
        .into();
        assert!(!err.is_link_failure());

        let err: Error = EngineError::Stopped.into();
        assert!(matches!(err, Error::Engine(EngineError::Stopped)));
    }
}
