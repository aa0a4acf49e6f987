// SessionState - the timeline plus the UI selection
//
// Commands modify the timeline through this struct so the selected track
// keeps pointing at the same sequencer after structural edits.

use crate::sequencer::clock::Clock;
use crate::sequencer::timeline::{SequencerSnapshot, Timeline, TimelineResult};

/// Central editable state of a session
pub struct SessionState<C: Clock> {
    timeline: Timeline<C>,

    /// Index of the selected track, if any
    selected: Option<usize>,
}

impl<C: Clock> SessionState<C> {
    pub fn new(timeline: Timeline<C>) -> Self {
        Self {
            timeline,
            selected: None,
        }
    }

    pub fn timeline(&self) -> &Timeline<C> {
        &self.timeline
    }

    /// Direct timeline access for edits that do not change track order
    pub fn timeline_mut(&mut self) -> &mut Timeline<C> {
        &mut self.timeline
    }

    pub fn into_timeline(self) -> Timeline<C> {
        self.timeline
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Select a track; `None` clears the selection
    pub fn select(&mut self, index: Option<usize>) -> TimelineResult<()> {
        if let Some(index) = index {
            self.timeline.sequencer(index)?;
        }
        self.selected = index;
        Ok(())
    }

    /// Append a track and select it
    pub fn add_sequencer(&mut self, name: Option<String>) -> TimelineResult<usize> {
        let index = match name {
            Some(name) => self.timeline.add_sequencer(name)?,
            None => self.timeline.add_default_sequencer()?,
        };
        self.selected = Some(index);
        Ok(index)
    }

    /// Insert a track and select it
    pub fn insert_sequencer(&mut self, index: usize, snapshot: SequencerSnapshot) -> TimelineResult<()> {
        self.timeline.insert_sequencer(index, snapshot)?;
        self.selected = Some(index);
        Ok(())
    }

    /// Remove a track; the selection stays on the same sequencer, or moves to
    /// the nearest remaining track when the selected one is removed
    pub fn remove_sequencer(&mut self, index: usize) -> TimelineResult<SequencerSnapshot> {
        let snapshot = self.timeline.remove_sequencer(index)?;
        let remaining = self.timeline.sequencer_count();

        self.selected = match self.selected {
            _ if remaining == 0 => None,
            Some(selected) if selected > index => Some(selected - 1),
            Some(selected) if selected == index => Some(index.min(remaining - 1)),
            other => other,
        };
        Ok(snapshot)
    }

    /// Move a track up; the selection follows whichever tracks swapped
    pub fn move_sequencer_up(&mut self, index: usize) -> TimelineResult<bool> {
        let moved = self.timeline.move_sequencer_up(index)?;
        if moved {
            self.follow_swap(index, index - 1);
        }
        Ok(moved)
    }

    /// Move a track down; the selection follows whichever tracks swapped
    pub fn move_sequencer_down(&mut self, index: usize) -> TimelineResult<bool> {
        let moved = self.timeline.move_sequencer_down(index)?;
        if moved {
            self.follow_swap(index, index + 1);
        }
        Ok(moved)
    }

    fn follow_swap(&mut self, a: usize, b: usize) {
        self.selected = match self.selected {
            Some(s) if s == a => Some(b),
            Some(s) if s == b => Some(a),
            other => other,
        };
    }
}
