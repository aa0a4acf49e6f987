// CommandManager - Manages undo/redo stacks

use crate::command::state::SessionState;
use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::sequencer::clock::Clock;
use std::collections::VecDeque;

/// Default maximum number of commands to keep in history
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Manages command execution and undo/redo functionality
///
/// The CommandManager maintains two stacks:
/// - Undo stack: Commands that have been executed and can be undone
/// - Redo stack: Commands that have been undone and can be redone
///
/// A new command clears the redo stack. When the history limit is reached
/// the oldest command is dropped.
pub struct CommandManager<C: Clock> {
    /// Stack of commands that can be undone (most recent at the back)
    undo_stack: VecDeque<Box<dyn UndoableCommand<C>>>,

    /// Stack of commands that can be redone (most recent at the back)
    redo_stack: VecDeque<Box<dyn UndoableCommand<C>>>,

    /// Maximum number of commands to keep in history
    max_history: usize,
}

impl<C: Clock> CommandManager<C> {
    /// Create a new CommandManager with default settings
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    /// Create a new CommandManager with a custom history limit
    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_history),
            redo_stack: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Execute a command and add it to the undo stack
    ///
    /// # Errors
    /// Returns an error if the command execution fails. A failed command is
    /// not recorded and the redo stack is kept.
    pub fn execute(
        &mut self,
        mut command: Box<dyn UndoableCommand<C>>,
        state: &mut SessionState<C>,
    ) -> CommandResult<()> {
        command.execute(state)?;
        log::debug!("executed: {}", command.description());

        self.undo_stack.push_back(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }

        Ok(())
    }

    /// Undo the last command
    ///
    /// # Errors
    /// Returns an error if there is nothing to undo or the undo fails. A
    /// command whose undo fails is dropped from history.
    pub fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<String> {
        let mut command = self
            .undo_stack
            .pop_back()
            .ok_or_else(|| CommandError::UndoFailed("Nothing to undo".into()))?;

        let description = command.description();
        command.undo(state)?;
        log::debug!("undone: {}", description);

        self.redo_stack.push_back(command);

        Ok(description)
    }

    /// Redo the last undone command
    ///
    /// # Errors
    /// Returns an error if there is nothing to redo or the execution fails.
    pub fn redo(&mut self, state: &mut SessionState<C>) -> CommandResult<String> {
        let mut command = self
            .redo_stack
            .pop_back()
            .ok_or_else(|| CommandError::ExecutionFailed("Nothing to redo".into()))?;

        let description = command.description();
        command.execute(state)?;
        log::debug!("redone: {}", description);

        self.undo_stack.push_back(command);

        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get a description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|cmd| cmd.description())
    }

    /// Get a description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|cmd| cmd.description())
    }

    /// Clear all command history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

impl<C: Clock> Default for CommandManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::clock::RecordingClock;
    use crate::sequencer::timeline::Timeline;

    // Mock command that renames track 0
    struct MockCommand {
        value: i32,
        old_name: Option<String>,
    }

    impl MockCommand {
        fn new(value: i32) -> Self {
            Self {
                value,
                old_name: None,
            }
        }
    }

    impl UndoableCommand<RecordingClock> for MockCommand {
        fn execute(&mut self, state: &mut SessionState<RecordingClock>) -> CommandResult<()> {
            self.old_name = Some(state.timeline().sequencer(0)?.name().to_string());
            state.timeline_mut().rename_sequencer(0, self.value.to_string())?;
            Ok(())
        }

        fn undo(&mut self, state: &mut SessionState<RecordingClock>) -> CommandResult<()> {
            let old = self
                .old_name
                .take()
                .ok_or_else(|| CommandError::UndoFailed("Not executed".into()))?;
            state.timeline_mut().rename_sequencer(0, old)?;
            Ok(())
        }

        fn description(&self) -> String {
            format!("Set value to {}", self.value)
        }
    }

    fn create_test_state() -> SessionState<RecordingClock> {
        let timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["start"]).unwrap();
        SessionState::new(timeline)
    }

    fn track_name(state: &SessionState<RecordingClock>) -> &str {
        state.timeline().sequencers()[0].name()
    }

    #[test]
    fn test_execute_command() {
        let mut manager = CommandManager::new();
        let mut state = create_test_state();

        manager.execute(Box::new(MockCommand::new(42)), &mut state).unwrap();

        assert_eq!(track_name(&state), "42");
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
        assert!(manager.can_undo());
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_undo() {
        let mut manager = CommandManager::new();
        let mut state = create_test_state();

        manager.execute(Box::new(MockCommand::new(42)), &mut state).unwrap();

        let description = manager.undo(&mut state).unwrap();
        assert_eq!(description, "Set value to 42");
        assert_eq!(track_name(&state), "start");
        assert_eq!(manager.undo_count(), 0);
        assert_eq!(manager.redo_count(), 1);
        assert_eq!(manager.redo_description().as_deref(), Some("Set value to 42"));
    }

    #[test]
    fn test_redo() {
        let mut manager = CommandManager::new();
        let mut state = create_test_state();

        manager.execute(Box::new(MockCommand::new(42)), &mut state).unwrap();
        manager.undo(&mut state).unwrap();

        let description = manager.redo(&mut state).unwrap();
        assert_eq!(description, "Set value to 42");
        assert_eq!(track_name(&state), "42");
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_redo_stack_cleared_on_new_command() {
        let mut manager = CommandManager::new();
        let mut state = create_test_state();

        manager.execute(Box::new(MockCommand::new(1)), &mut state).unwrap();
        manager.undo(&mut state).unwrap();
        manager.execute(Box::new(MockCommand::new(2)), &mut state).unwrap();

        assert!(!manager.can_redo());
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_history_limit() {
        let mut manager = CommandManager::with_capacity(3);
        let mut state = create_test_state();

        for i in 0..5 {
            manager.execute(Box::new(MockCommand::new(i)), &mut state).unwrap();
        }

        assert_eq!(manager.undo_count(), 3);
        assert_eq!(manager.undo_description().as_deref(), Some("Set value to 4"));
    }

    #[test]
    fn test_failed_command_not_recorded() {
        let mut manager = CommandManager::new();
        let mut state = SessionState::new(Timeline::new(RecordingClock::new(), 4).unwrap());

        // No track 0 to rename
        assert!(manager.execute(Box::new(MockCommand::new(1)), &mut state).is_err());
        assert_eq!(manager.undo_count(), 0);
    }

    #[test]
    fn test_undo_with_empty_stack() {
        let mut manager: CommandManager<RecordingClock> = CommandManager::new();
        let mut state = create_test_state();

        assert!(manager.undo(&mut state).is_err());
    }

    #[test]
    fn test_redo_with_empty_stack() {
        let mut manager: CommandManager<RecordingClock> = CommandManager::new();
        let mut state = create_test_state();

        assert!(manager.redo(&mut state).is_err());
    }
}
