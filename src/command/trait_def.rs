// UndoableCommand trait definition

use crate::command::state::SessionState;
use crate::sequencer::clock::Clock;
use crate::sequencer::timeline::TimelineError;
use std::fmt;

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur during command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Command execution failed
    ExecutionFailed(String),
    /// Undo operation failed
    UndoFailed(String),
    /// The timeline rejected the edit
    Timeline(TimelineError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            CommandError::UndoFailed(msg) => write!(f, "Undo failed: {}", msg),
            CommandError::Timeline(err) => write!(f, "Timeline error: {}", err),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Timeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TimelineError> for CommandError {
    fn from(err: TimelineError) -> Self {
        CommandError::Timeline(err)
    }
}

/// Trait for timeline edits that support undo/redo
///
/// A command captures whatever it needs to reverse itself while executing.
/// Undo always runs against the state the command left behind, so positional
/// indices captured during `execute` are still valid in `undo`.
///
/// # Example
/// ```no_run
/// use block_timeline::command::state::SessionState;
/// use block_timeline::command::trait_def::{CommandError, CommandResult, UndoableCommand};
/// use block_timeline::sequencer::clock::Clock;
///
/// struct RenameCommand {
///     track: usize,
///     name: String,
///     old_name: Option<String>,
/// }
///
/// impl<C: Clock> UndoableCommand<C> for RenameCommand {
///     fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
///         let old = state.timeline().sequencer(self.track)?.name().to_string();
///         state.timeline_mut().rename_sequencer(self.track, self.name.clone())?;
///         self.old_name = Some(old);
///         Ok(())
///     }
///
///     fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
///         let old = self
///             .old_name
///             .clone()
///             .ok_or_else(|| CommandError::UndoFailed("No previous name stored".into()))?;
///         state.timeline_mut().rename_sequencer(self.track, old)?;
///         Ok(())
///     }
///
///     fn description(&self) -> String {
///         format!("Rename to {}", self.name)
///     }
/// }
/// ```
pub trait UndoableCommand<C: Clock>: Send {
    /// Execute the command
    ///
    /// Should store the previous state internally for undo capability.
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()>;

    /// Undo the command
    ///
    /// Restores the state to what it was before execute() was called.
    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()>;

    /// Get a human-readable description of the command
    ///
    /// Used for UI display (e.g., "Undo: Toggle block 2 on Bass")
    fn description(&self) -> String;
}
