// Command Pattern for Undo/Redo functionality
//
// Every user-facing timeline edit goes through an UndoableCommand so it can be
// reversed.
//
// Architecture:
// - UndoableCommand trait: Defines execute(), undo(), description()
// - CommandManager: Manages undo/redo stacks
// - SessionState: the Timeline plus the selected track
// - Concrete commands: ToggleBlockCommand, SetLengthCommand, etc.

pub mod commands;
pub mod manager;
pub mod state;
pub mod trait_def;

pub use commands::{
    AddSequencerCommand, MoveDirection, MoveSequencerCommand, RemoveSequencerCommand,
    SetLengthCommand, SetSequencerLoopCommand, ToggleBlockCommand,
};
pub use manager::CommandManager;
pub use state::SessionState;
pub use trait_def::{CommandError, CommandResult, UndoableCommand};
