//! Line-oriented console transport
//!
//! Each stdin line is either a machine command word or a raw G-code line.
//! Recognized words: `home`, `unlock`, `pause`, `resume`, `stop`, `zero`,
//! `origin`, `jog <x> <y> <z> <feed>` and `quit`. Words are case-insensitive.

use olos_communication::{EngineHandle, MachineCommand};
use olos_core::{EngineError, MessageKind, Priority};
use thiserror::Error;

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    /// A machine command
    Command(MachineCommand),
    /// A line to send to the controller verbatim
    Raw(String),
    /// Stop the service
    Quit,
    /// Blank line
    Empty,
}

/// Console input errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// `jog` needs four numbers
    #[error("Usage: jog <x> <y> <z> <feed>, got '{0}'")]
    JogArguments(String),
}

/// Parse one console line
pub fn parse_line(line: &str) -> Result<ConsoleInput, ConsoleError> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(ConsoleInput::Empty);
    };

    let command = match first.to_ascii_lowercase().as_str() {
        "quit" | "exit" => return Ok(ConsoleInput::Quit),
        "home" => MachineCommand::Home,
        "unlock" => MachineCommand::Unlock,
        "pause" => MachineCommand::Pause,
        "resume" => MachineCommand::Resume,
        "stop" => MachineCommand::Stop,
        "zero" => MachineCommand::ResetZero,
        "origin" => MachineCommand::ReturnToZero,
        "jog" => parse_jog(line, words)?,
        _ => return Ok(ConsoleInput::Raw(line.to_string())),
    };
    Ok(ConsoleInput::Command(command))
}

fn parse_jog<'a>(
    line: &str,
    words: impl Iterator<Item = &'a str>,
) -> Result<MachineCommand, ConsoleError> {
    let values: Vec<f64> = words
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| ConsoleError::JogArguments(line.to_string()))?;

    match values[..] {
        [x, y, z, feed] if feed > 0.0 => Ok(MachineCommand::Jog { x, y, z, feed }),
        _ => Err(ConsoleError::JogArguments(line.to_string())),
    }
}

/// Apply one console line to the engine. Returns `false` when the user asked to quit.
pub fn dispatch(handle: &EngineHandle, line: &str) -> Result<bool, EngineError> {
    match parse_line(line) {
        Ok(ConsoleInput::Quit) => return Ok(false),
        Ok(ConsoleInput::Empty) => {}
        Ok(ConsoleInput::Command(command)) => handle.request(command)?,
        Ok(ConsoleInput::Raw(text)) => {
            tracing::debug!("Queueing raw line {:?}", text);
            handle.send_line(MessageKind::Normal, Priority::Mid, text);
        }
        Err(e) => tracing::warn!("{}", e),
    }
    Ok(true)
}
