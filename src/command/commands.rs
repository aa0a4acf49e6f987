// Concrete command implementations

use crate::command::state::SessionState;
use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::sequencer::clock::Clock;
use crate::sequencer::timeline::SequencerSnapshot;

/// Command to toggle one block of the grid
pub struct ToggleBlockCommand {
    track: usize,
    bar: usize,
    now_active: Option<bool>,
}

impl ToggleBlockCommand {
    pub fn new(track: usize, bar: usize) -> Self {
        Self {
            track,
            bar,
            now_active: None,
        }
    }
}

impl<C: Clock> UndoableCommand<C> for ToggleBlockCommand {
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        self.now_active = Some(state.timeline_mut().toggle_block(self.track, self.bar)?);
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let was_added = self
            .now_active
            .ok_or_else(|| CommandError::UndoFailed("Block was never toggled".into()))?;

        let timeline = state.timeline_mut();
        if was_added {
            timeline.remove_block(self.track, self.bar)?;
        } else {
            timeline.add_block(self.track, self.bar)?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Toggle block {} on track {}", self.bar, self.track)
    }
}

/// Command to append a track
///
/// Redo re-inserts the exact track that undo removed.
pub struct AddSequencerCommand {
    name: Option<String>,
    index: Option<usize>,
    removed: Option<SequencerSnapshot>,
}

impl AddSequencerCommand {
    /// `None` picks the default `Sequencer-<n>` name
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            index: None,
            removed: None,
        }
    }
}

impl<C: Clock> UndoableCommand<C> for AddSequencerCommand {
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        match (self.index, self.removed.take()) {
            (Some(index), Some(snapshot)) => state.insert_sequencer(index, snapshot)?,
            _ => self.index = Some(state.add_sequencer(self.name.clone())?),
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let index = self
            .index
            .ok_or_else(|| CommandError::UndoFailed("Sequencer was never added".into()))?;
        self.removed = Some(state.remove_sequencer(index)?);
        Ok(())
    }

    fn description(&self) -> String {
        match &self.name {
            Some(name) => format!("Add sequencer {}", name),
            None => "Add sequencer".to_string(),
        }
    }
}

/// Command to remove a track, keeping its blocks for undo
pub struct RemoveSequencerCommand {
    index: usize,
    removed: Option<SequencerSnapshot>,
}

impl RemoveSequencerCommand {
    pub fn new(index: usize) -> Self {
        Self { index, removed: None }
    }
}

impl<C: Clock> UndoableCommand<C> for RemoveSequencerCommand {
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        self.removed = Some(state.remove_sequencer(self.index)?);
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let snapshot = self
            .removed
            .take()
            .ok_or_else(|| CommandError::UndoFailed("No removed sequencer stored".into()))?;
        state.insert_sequencer(self.index, snapshot)?;
        Ok(())
    }

    fn description(&self) -> String {
        match &self.removed {
            Some(snapshot) => format!("Remove sequencer {}", snapshot.name),
            None => format!("Remove sequencer {}", self.index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Command to move a track one slot up or down
pub struct MoveSequencerCommand {
    index: usize,
    direction: MoveDirection,
    moved: bool,
}

impl MoveSequencerCommand {
    pub fn new(index: usize, direction: MoveDirection) -> Self {
        Self {
            index,
            direction,
            moved: false,
        }
    }
}

impl<C: Clock> UndoableCommand<C> for MoveSequencerCommand {
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        self.moved = match self.direction {
            MoveDirection::Up => state.move_sequencer_up(self.index)?,
            MoveDirection::Down => state.move_sequencer_down(self.index)?,
        };
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        // A move at the edge changed nothing
        if !self.moved {
            return Ok(());
        }
        match self.direction {
            MoveDirection::Up => state.move_sequencer_down(self.index - 1)?,
            MoveDirection::Down => state.move_sequencer_up(self.index + 1)?,
        };
        Ok(())
    }

    fn description(&self) -> String {
        match self.direction {
            MoveDirection::Up => format!("Move sequencer {} up", self.index),
            MoveDirection::Down => format!("Move sequencer {} down", self.index),
        }
    }
}

/// Command to resize the loop
///
/// Shrinking drops the cut-off bars from the activation maps; undo brings
/// them back.
pub struct SetLengthCommand {
    new_length: usize,
    old_length: Option<usize>,
    truncated: Vec<(usize, Vec<usize>)>,
}

impl SetLengthCommand {
    pub fn new(length: usize) -> Self {
        Self {
            new_length: length,
            old_length: None,
            truncated: Vec::new(),
        }
    }
}

impl<C: Clock> UndoableCommand<C> for SetLengthCommand {
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let timeline = state.timeline_mut();
        let old_length = timeline.length();

        let truncated: Vec<(usize, Vec<usize>)> = timeline
            .sequencers()
            .iter()
            .enumerate()
            .filter_map(|(track, seq)| {
                let lost: Vec<usize> = seq
                    .events()
                    .active_bars()
                    .into_iter()
                    .filter(|&bar| bar >= self.new_length)
                    .collect();
                (!lost.is_empty()).then_some((track, lost))
            })
            .collect();

        timeline.set_length(self.new_length)?;
        self.old_length = Some(old_length);
        self.truncated = truncated;
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let old_length = self
            .old_length
            .ok_or_else(|| CommandError::UndoFailed("No previous length stored".into()))?;

        let timeline = state.timeline_mut();
        timeline.set_length(old_length)?;
        for (track, bars) in &self.truncated {
            for &bar in bars {
                timeline.add_block(*track, bar)?;
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Set length to {} bars", self.new_length)
    }
}

/// Command to switch sequencer loop mode
pub struct SetSequencerLoopCommand {
    enabled: bool,
    previous: Option<bool>,
}

impl SetSequencerLoopCommand {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            previous: None,
        }
    }
}

impl<C: Clock> UndoableCommand<C> for SetSequencerLoopCommand {
    fn execute(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let timeline = state.timeline_mut();
        let previous = timeline.is_sequencer_loop();
        timeline.set_sequencer_loop(self.enabled)?;
        self.previous = Some(previous);
        Ok(())
    }

    fn undo(&mut self, state: &mut SessionState<C>) -> CommandResult<()> {
        let previous = self
            .previous
            .ok_or_else(|| CommandError::UndoFailed("No previous loop mode stored".into()))?;
        state.timeline_mut().set_sequencer_loop(previous)?;
        Ok(())
    }

    fn description(&self) -> String {
        if self.enabled {
            "Enable sequencer loop".to_string()
        } else {
            "Disable sequencer loop".to_string()
        }
    }
}
