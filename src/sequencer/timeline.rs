// Timeline - ordered tracks over a looping span of bars
// Keeps every track's clock registrations equal to its activation map

use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, TimelineChange};
use crate::sequencer::activation::ActivationMap;
use crate::sequencer::clock::{Clock, ClockError, SequencerHandle};
use crate::sequencer::note::TriggerPayload;
use crate::sequencer::time::BarTime;
use crate::sequencer::track::Sequencer;
use ringbuf::traits::Producer;

/// Timeline error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("track index {index} out of range ({count} tracks)")]
    TrackOutOfRange { index: usize, count: usize },

    #[error("bar index {index} out of range (length {length})")]
    BarOutOfRange { index: usize, length: usize },

    #[error("timeline length must be between 1 and {max} bars, got {length}")]
    InvalidLength { length: usize, max: usize },

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}

pub type TimelineResult<T> = Result<T, TimelineError>;

/// Everything needed to recreate a removed track
///
/// A snapshot taken by `remove_sequencer` keeps the track's handle, so
/// reinserting it reconnects whatever the clock still holds for that
/// handle. Without a handle, or while the handle is in use, the restored
/// track gets a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSnapshot {
    pub handle: Option<SequencerHandle>,
    pub name: String,
    pub events: Vec<bool>,
    pub payload: TriggerPayload,
}

/// A looping grid of tracks × bars bound to a clock
///
/// Invariant between any two calls: for every track, the clock holds exactly
/// one start registration at bar `k` and one stop registration at bar `k + 1`
/// for each active bar `k`, plus the phantom pair at `[length, length + 1)`
/// while sequencer loop mode is on. Registrations never outlive the track.
///
/// Track and bar indices are positional. After `remove_sequencer` or a move,
/// callers holding indices must re-derive them.
pub struct Timeline<C: Clock> {
    length: usize,
    sequencers: Vec<Sequencer>,
    sequencer_loop: bool,
    default_payload: TriggerPayload,
    clock: C,
    notifier: Option<NotificationProducer>,
}

impl<C: Clock> Timeline<C> {
    /// Longest loop a timeline accepts
    pub const MAX_LENGTH: usize = 4096;

    /// Create an empty timeline and set the clock's loop end to `length` bars
    pub fn new(clock: C, length: usize) -> TimelineResult<Self> {
        Self::check_length(length)?;

        let mut clock = clock;
        clock.set_loop_end(length as u32)?;

        Ok(Self {
            length,
            sequencers: Vec::new(),
            sequencer_loop: false,
            default_payload: TriggerPayload::default(),
            clock,
            notifier: None,
        })
    }

    /// Create a timeline with one empty track per name
    pub fn with_sequencers<S: Into<String>>(
        clock: C,
        length: usize,
        names: impl IntoIterator<Item = S>,
    ) -> TimelineResult<Self> {
        let mut timeline = Self::new(clock, length)?;
        for name in names {
            timeline.add_sequencer(name)?;
        }
        Ok(timeline)
    }

    /// Send a notification for every change into `producer`
    pub fn set_notifier(&mut self, producer: NotificationProducer) {
        self.notifier = Some(producer);
    }

    pub fn take_notifier(&mut self) -> Option<NotificationProducer> {
        self.notifier.take()
    }

    /// Payload given to tracks created from now on
    pub fn set_default_payload(&mut self, payload: TriggerPayload) {
        self.default_payload = payload;
    }

    pub fn default_payload(&self) -> TriggerPayload {
        self.default_payload
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn sequencers(&self) -> &[Sequencer] {
        &self.sequencers
    }

    pub fn sequencer_count(&self) -> usize {
        self.sequencers.len()
    }

    pub fn sequencer(&self, index: usize) -> TimelineResult<&Sequencer> {
        self.sequencers
            .get(index)
            .ok_or(TimelineError::TrackOutOfRange {
                index,
                count: self.sequencers.len(),
            })
    }

    pub fn is_sequencer_loop(&self) -> bool {
        self.sequencer_loop
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutable access to the clock, for driving playback
    ///
    /// Registering or cancelling through this handle bypasses the timeline
    /// and breaks its invariant; use it to play, pause and advance.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Bar under the clock's cursor
    pub fn current_bar(&self) -> u32 {
        self.clock.position().bar
    }

    /// Move the clock's cursor to the downbeat of `bar`
    pub fn seek_to_bar(&mut self, bar: usize) -> TimelineResult<()> {
        self.check_bar(bar)?;
        self.clock.seek(BarTime::at_bar(bar as u32));
        Ok(())
    }

    /// Activate `bar` on track `track` and register its window
    pub fn add_block(&mut self, track: usize, bar: usize) -> TimelineResult<()> {
        self.check_track(track)?;
        self.check_bar(bar)?;

        let sequencer = &mut self.sequencers[track];
        if sequencer.is_active(bar) {
            // Already registered; the cheap path below would duplicate it
            return Ok(());
        }
        sequencer.events_mut().set(bar, true);

        let future_active = sequencer.events().active_after(bar);
        if future_active.is_empty() {
            // Nothing registered after `bar` except possibly the phantom pair,
            // which sits past every real bar, so one new pair is enough.
            // This holds only as long as no path leaves registrations beyond
            // the highest active bar; shrinking the length cancels them.
            sequencer.schedule_bar(&mut self.clock, bar as u32)?;
        } else {
            log::debug!(
                "add_block({}, {}): later blocks {:?}, full rebuild",
                track,
                bar,
                future_active
            );
            Self::rebuild(&mut self.clock, sequencer, self.length, self.sequencer_loop)?;
        }

        self.notify(TimelineChange::BlockAdded { track, bar });
        Ok(())
    }

    /// Deactivate `bar` on track `track` and rebuild its registrations
    pub fn remove_block(&mut self, track: usize, bar: usize) -> TimelineResult<()> {
        self.check_track(track)?;
        self.check_bar(bar)?;

        let sequencer = &mut self.sequencers[track];
        let was_active = sequencer.is_active(bar);

        // Clear the bar first so the rebuild registers only the others
        sequencer.events_mut().set(bar, false);
        Self::rebuild(&mut self.clock, sequencer, self.length, self.sequencer_loop)?;

        if was_active {
            self.notify(TimelineChange::BlockRemoved { track, bar });
        }
        Ok(())
    }

    /// Grid click: remove an active block, add an inactive one
    ///
    /// Returns the new state of the block.
    pub fn toggle_block(&mut self, track: usize, bar: usize) -> TimelineResult<bool> {
        if self.sequencer(track)?.is_active(bar) {
            self.remove_block(track, bar)?;
            Ok(false)
        } else {
            self.add_block(track, bar)?;
            Ok(true)
        }
    }

    /// Re-derive every registration of `track` from its activation map
    ///
    /// Also the recovery path after a failed edit: the result depends only on
    /// the activation map and the loop mode, never on prior registrations.
    pub fn reschedule_sequencer(&mut self, track: usize) -> TimelineResult<()> {
        self.check_track(track)?;
        Self::rebuild(
            &mut self.clock,
            &self.sequencers[track],
            self.length,
            self.sequencer_loop,
        )?;
        self.notify(TimelineChange::SequencerRescheduled { index: track });
        Ok(())
    }

    /// Replace the whole activation map of `track`
    ///
    /// `bars` is padded or truncated to the timeline length.
    pub fn replace_events(&mut self, track: usize, bars: &[bool]) -> TimelineResult<()> {
        self.check_track(track)?;

        let mut events = ActivationMap::from_bars(bars.to_vec());
        events.resize(self.length);
        let sequencer = &mut self.sequencers[track];
        *sequencer.events_mut() = events;
        Self::rebuild(&mut self.clock, sequencer, self.length, self.sequencer_loop)?;

        self.notify(TimelineChange::SequencerUpdated { index: track });
        Ok(())
    }

    /// Resize the loop
    ///
    /// Every activation map is padded or truncated and the clock's loop end
    /// moves. Tracks that lose active bars are rebuilt at once so nothing
    /// stays registered past the new end; in sequencer loop mode every track
    /// is rebuilt because the phantom pair follows the length.
    pub fn set_length(&mut self, length: usize) -> TimelineResult<()> {
        Self::check_length(length)?;
        let old = self.length;
        if length == old {
            return Ok(());
        }

        self.clock.set_loop_end(length as u32)?;
        self.length = length;

        let mut stale = Vec::new();
        for (index, sequencer) in self.sequencers.iter_mut().enumerate() {
            let loses_blocks = sequencer.events().active_bars().iter().any(|&bar| bar >= length);
            sequencer.set_length(length);
            if loses_blocks || self.sequencer_loop {
                stale.push(index);
            }
        }

        for index in stale {
            Self::rebuild(
                &mut self.clock,
                &self.sequencers[index],
                self.length,
                self.sequencer_loop,
            )?;
        }

        log::debug!("timeline length {} -> {}", old, length);
        self.notify(TimelineChange::LengthChanged { old, new: length });
        Ok(())
    }

    /// "+" button
    pub fn increase_length(&mut self) -> TimelineResult<()> {
        self.set_length(self.length + 1)
    }

    /// "-" button; a one-bar timeline cannot shrink
    pub fn decrease_length(&mut self) -> TimelineResult<()> {
        self.set_length(self.length.saturating_sub(1))
    }

    /// Switch sequencer loop mode; every track is rebuilt so the phantom
    /// pair appears or disappears immediately
    pub fn set_sequencer_loop(&mut self, enabled: bool) -> TimelineResult<()> {
        if self.sequencer_loop == enabled {
            return Ok(());
        }
        self.sequencer_loop = enabled;

        for sequencer in &self.sequencers {
            Self::rebuild(&mut self.clock, sequencer, self.length, enabled)?;
        }

        self.notify(TimelineChange::SequencerLoopChanged { enabled });
        Ok(())
    }

    /// Append an empty track; returns its index
    ///
    /// In sequencer loop mode the new track registers its phantom pair at
    /// once. If the clock refuses it the track is disposed and not added.
    pub fn add_sequencer(&mut self, name: impl Into<String>) -> TimelineResult<usize> {
        let sequencer = Sequencer::with_payload(name, self.length, self.default_payload);
        if self.sequencer_loop {
            if let Err(e) = Self::rebuild(&mut self.clock, &sequencer, self.length, true) {
                sequencer.dispose(&mut self.clock);
                return Err(e.into());
            }
        }

        log::debug!("add sequencer '{}' ({})", sequencer.name(), sequencer.handle());
        self.sequencers.push(sequencer);
        let index = self.sequencers.len() - 1;
        self.notify(TimelineChange::SequencerAdded { index });
        Ok(index)
    }

    /// Append an empty track named `Sequencer-<n>`
    pub fn add_default_sequencer(&mut self) -> TimelineResult<usize> {
        let name = format!("Sequencer-{}", self.sequencers.len() + 1);
        self.add_sequencer(name)
    }

    /// Insert a track at `index` from a snapshot and register its windows
    pub fn insert_sequencer(
        &mut self,
        index: usize,
        snapshot: SequencerSnapshot,
    ) -> TimelineResult<()> {
        if index > self.sequencers.len() {
            return Err(TimelineError::TrackOutOfRange {
                index,
                count: self.sequencers.len(),
            });
        }

        let mut events = ActivationMap::from_bars(snapshot.events);
        events.resize(self.length);
        let handle = match snapshot.handle {
            Some(handle) if self.sequencers.iter().all(|s| s.handle() != handle) => {
                self.clock.reclaim(handle);
                handle
            }
            _ => SequencerHandle::next(),
        };
        let sequencer = Sequencer::restore(handle, snapshot.name, events, snapshot.payload);
        self.sequencers.insert(index, sequencer);

        Self::rebuild(
            &mut self.clock,
            &self.sequencers[index],
            self.length,
            self.sequencer_loop,
        )?;

        self.notify(TimelineChange::SequencerAdded { index });
        Ok(())
    }

    /// Dispose the track at `index` and remove it; later tracks shift down
    pub fn remove_sequencer(&mut self, index: usize) -> TimelineResult<SequencerSnapshot> {
        self.check_track(index)?;

        let sequencer = self.sequencers.remove(index);
        sequencer.dispose(&mut self.clock);
        let snapshot = Self::snapshot_of(&sequencer);

        self.notify(TimelineChange::SequencerRemoved { index });
        Ok(snapshot)
    }

    /// Swap with the track above; `false` when already first
    pub fn move_sequencer_up(&mut self, index: usize) -> TimelineResult<bool> {
        self.check_track(index)?;
        if index == 0 {
            return Ok(false);
        }

        self.sequencers.swap(index, index - 1);
        self.notify(TimelineChange::SequencerMoved {
            from: index,
            to: index - 1,
        });
        Ok(true)
    }

    /// Swap with the track below; `false` when already last
    pub fn move_sequencer_down(&mut self, index: usize) -> TimelineResult<bool> {
        self.check_track(index)?;
        if index + 1 >= self.sequencers.len() {
            return Ok(false);
        }

        self.sequencers.swap(index, index + 1);
        self.notify(TimelineChange::SequencerMoved {
            from: index,
            to: index + 1,
        });
        Ok(true)
    }

    pub fn rename_sequencer(&mut self, index: usize, name: impl Into<String>) -> TimelineResult<()> {
        self.check_track(index)?;
        self.sequencers[index].set_name(name);
        self.notify(TimelineChange::SequencerUpdated { index });
        Ok(())
    }

    /// Change what a track plays and re-register its windows with it
    pub fn set_sequencer_payload(
        &mut self,
        index: usize,
        payload: TriggerPayload,
    ) -> TimelineResult<()> {
        self.check_track(index)?;
        let sequencer = &mut self.sequencers[index];
        sequencer.set_payload(payload);
        Self::rebuild(&mut self.clock, sequencer, self.length, self.sequencer_loop)?;
        self.notify(TimelineChange::SequencerUpdated { index });
        Ok(())
    }

    pub fn snapshot(&self, index: usize) -> TimelineResult<SequencerSnapshot> {
        self.sequencer(index).map(Self::snapshot_of)
    }

    fn snapshot_of(sequencer: &Sequencer) -> SequencerSnapshot {
        SequencerSnapshot {
            handle: Some(sequencer.handle()),
            name: sequencer.name().to_string(),
            events: sequencer.events().as_slice().to_vec(),
            payload: sequencer.payload(),
        }
    }

    /// Reset, then register one pair per active bar in ascending order plus
    /// the phantom pair in sequencer loop mode
    fn rebuild(
        clock: &mut C,
        sequencer: &Sequencer,
        length: usize,
        sequencer_loop: bool,
    ) -> Result<(), ClockError> {
        sequencer.reset_sequences(clock);
        for bar in sequencer.events().active_bars() {
            sequencer.schedule_bar(clock, bar as u32)?;
        }
        if sequencer_loop {
            sequencer.schedule_bar(clock, length as u32)?;
        }
        Ok(())
    }

    fn notify(&mut self, change: TimelineChange) {
        if let Some(notifier) = self.notifier.as_mut() {
            if notifier.try_push(Notification::new(change)).is_err() {
                log::warn!("notification buffer full, change dropped");
            }
        }
    }

    fn check_track(&self, index: usize) -> TimelineResult<()> {
        if index < self.sequencers.len() {
            Ok(())
        } else {
            Err(TimelineError::TrackOutOfRange {
                index,
                count: self.sequencers.len(),
            })
        }
    }

    fn check_bar(&self, index: usize) -> TimelineResult<()> {
        if index < self.length {
            Ok(())
        } else {
            Err(TimelineError::BarOutOfRange {
                index,
                length: self.length,
            })
        }
    }

    fn check_length(length: usize) -> TimelineResult<()> {
        if (1..=Self::MAX_LENGTH).contains(&length) {
            Ok(())
        } else {
            Err(TimelineError::InvalidLength {
                length,
                max: Self::MAX_LENGTH,
            })
        }
    }
}

impl<C: Clock> Drop for Timeline<C> {
    fn drop(&mut self) {
        for sequencer in &self.sequencers {
            sequencer.dispose(&mut self.clock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_notification_channel;
    use crate::sequencer::clock::RecordingClock;
    use ringbuf::traits::Consumer;

    fn pairs(bars: &[u32]) -> Vec<(u32, bool)> {
        let mut expected: Vec<(u32, bool)> =
            bars.iter().flat_map(|&b| [(b, true), (b + 1, false)]).collect();
        expected.sort_unstable();
        expected
    }

    fn schedule(timeline: &Timeline<RecordingClock>, track: usize) -> Vec<(u32, bool)> {
        let handle = timeline.sequencers()[track].handle();
        timeline.clock().schedule_for(handle)
    }

    #[test]
    fn test_new_sets_loop_end() {
        let timeline = Timeline::new(RecordingClock::new(), 4).unwrap();
        assert_eq!(timeline.length(), 4);
        assert_eq!(timeline.clock().loop_end(), Some(4));
    }

    #[test]
    fn test_invalid_length_rejected() {
        assert!(matches!(
            Timeline::new(RecordingClock::new(), 0),
            Err(TimelineError::InvalidLength { length: 0, .. })
        ));
    }

    #[test]
    fn test_add_block_cheap_path() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();

        timeline.add_block(0, 2).unwrap();
        assert_eq!(timeline.sequencers()[0].events().as_slice(), &[false, false, true, false]);
        assert_eq!(schedule(&timeline, 0), pairs(&[2]));
    }

    #[test]
    fn test_add_block_before_later_block_rebuilds() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();

        timeline.add_block(0, 2).unwrap();
        timeline.add_block(0, 0).unwrap();
        assert_eq!(timeline.sequencers()[0].events().as_slice(), &[true, false, true, false]);
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 2]));
    }

    #[test]
    fn test_add_block_twice_does_not_duplicate() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();

        timeline.add_block(0, 3).unwrap();
        timeline.add_block(0, 3).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[3]));
    }

    #[test]
    fn test_remove_block() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();
        timeline.add_block(0, 1).unwrap();
        timeline.add_block(0, 2).unwrap();

        timeline.remove_block(0, 1).unwrap();
        assert!(!timeline.sequencers()[0].is_active(1));
        assert_eq!(schedule(&timeline, 0), pairs(&[2]));

        timeline.remove_block(0, 2).unwrap();
        assert!(schedule(&timeline, 0).is_empty());
    }

    #[test]
    fn test_toggle_block() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();

        assert!(timeline.toggle_block(0, 1).unwrap());
        assert!(!timeline.toggle_block(0, 1).unwrap());
        assert!(schedule(&timeline, 0).is_empty());
    }

    #[test]
    fn test_out_of_range_is_rejected_without_side_effects() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();

        assert_eq!(
            timeline.add_block(1, 0),
            Err(TimelineError::TrackOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(
            timeline.add_block(0, 4),
            Err(TimelineError::BarOutOfRange { index: 4, length: 4 })
        );
        assert!(timeline.clock().registrations().is_empty());
        assert_eq!(timeline.sequencers()[0].events().active_count(), 0);
    }

    #[test]
    fn test_reschedule_is_idempotent() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();
        timeline.add_block(0, 0).unwrap();
        timeline.add_block(0, 3).unwrap();

        timeline.reschedule_sequencer(0).unwrap();
        timeline.reschedule_sequencer(0).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 3]));
    }

    #[test]
    fn test_sequencer_loop_phantom_pair() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 2, ["A"]).unwrap();
        timeline.add_block(0, 0).unwrap();

        timeline.set_sequencer_loop(true).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 2]));

        // Edits keep the phantom pair
        timeline.add_block(0, 1).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 1, 2]));
        timeline.remove_block(0, 0).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[1, 2]));

        timeline.set_sequencer_loop(false).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[1]));
    }

    #[test]
    fn test_grow_length_pads_and_moves_loop_end() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A", "B"]).unwrap();
        timeline.add_block(0, 0).unwrap();
        timeline.add_block(0, 2).unwrap();

        timeline.set_length(6).unwrap();
        assert_eq!(
            timeline.sequencers()[0].events().as_slice(),
            &[true, false, true, false, false, false]
        );
        assert_eq!(timeline.sequencers()[1].len(), 6);
        assert_eq!(timeline.clock().loop_end_time().as_deref(), Some("6:0:0"));
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 2]));
    }

    #[test]
    fn test_shrink_length_cancels_cut_off_bars() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();
        timeline.add_block(0, 0).unwrap();
        timeline.add_block(0, 3).unwrap();

        timeline.set_length(2).unwrap();
        assert_eq!(timeline.sequencers()[0].events().as_slice(), &[true, false]);
        assert_eq!(schedule(&timeline, 0), pairs(&[0]));

        // Cheap path stays valid after the shrink
        timeline.add_block(0, 1).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 1]));
    }

    #[test]
    fn test_length_change_moves_phantom_pair() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 2, ["A"]).unwrap();
        timeline.set_sequencer_loop(true).unwrap();

        timeline.set_length(3).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[3]));
    }

    #[test]
    fn test_decrease_length_stops_at_one() {
        let mut timeline = Timeline::new(RecordingClock::new(), 1).unwrap();
        assert!(timeline.decrease_length().is_err());
        assert_eq!(timeline.length(), 1);

        timeline.increase_length().unwrap();
        assert_eq!(timeline.length(), 2);
    }

    #[test]
    fn test_add_and_remove_sequencer() {
        let mut timeline = Timeline::new(RecordingClock::new(), 4).unwrap();
        assert_eq!(timeline.add_default_sequencer(), Ok(0));
        assert_eq!(timeline.add_default_sequencer(), Ok(1));
        assert_eq!(timeline.sequencers()[1].name(), "Sequencer-2");

        timeline.add_block(0, 1).unwrap();
        let handle = timeline.sequencers()[0].handle();

        let snapshot = timeline.remove_sequencer(0).unwrap();
        assert_eq!(snapshot.name, "Sequencer-1");
        assert_eq!(snapshot.events, vec![false, true, false, false]);
        assert!(timeline.clock().registrations_for(handle).is_empty());
        assert!(timeline.clock().was_released(handle));
        assert_eq!(timeline.sequencers()[0].name(), "Sequencer-2");
    }

    #[test]
    fn test_insert_sequencer_registers_windows() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();
        timeline
            .insert_sequencer(
                0,
                SequencerSnapshot {
                    handle: None,
                    name: "Restored".into(),
                    events: vec![true, true],
                    payload: TriggerPayload::default(),
                },
            )
            .unwrap();

        assert_eq!(timeline.sequencers()[0].name(), "Restored");
        assert_eq!(timeline.sequencers()[0].len(), 4);
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 1]));
        assert!(timeline.insert_sequencer(5, timeline.snapshot(0).unwrap()).is_err());
    }

    #[test]
    fn test_reinsert_keeps_handle_of_removed_track() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A", "B"]).unwrap();
        timeline.add_block(1, 3).unwrap();
        let handle = timeline.sequencers()[1].handle();

        let snapshot = timeline.remove_sequencer(1).unwrap();
        assert_eq!(snapshot.handle, Some(handle));
        timeline.insert_sequencer(1, snapshot).unwrap();

        assert_eq!(timeline.sequencers()[1].handle(), handle);
        assert!(timeline.clock().was_reclaimed(handle));
        assert_eq!(schedule(&timeline, 1), pairs(&[3]));

        // A copy of a live track never shares its handle
        let copy = timeline.snapshot(1).unwrap();
        timeline.insert_sequencer(2, copy).unwrap();
        assert_ne!(timeline.sequencers()[2].handle(), handle);
        assert_eq!(schedule(&timeline, 1), pairs(&[3]));
        assert_eq!(schedule(&timeline, 2), pairs(&[3]));
    }

    #[test]
    fn test_move_sequencers() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A", "B"]).unwrap();
        timeline.add_block(1, 2).unwrap();
        let handle_b = timeline.sequencers()[1].handle();

        assert!(!timeline.move_sequencer_up(0).unwrap());
        assert!(!timeline.move_sequencer_down(1).unwrap());

        assert!(timeline.move_sequencer_up(1).unwrap());
        assert_eq!(timeline.sequencers()[0].name(), "B");
        assert_eq!(timeline.sequencers()[0].handle(), handle_b);
        assert_eq!(schedule(&timeline, 0), pairs(&[2]));

        assert!(timeline.move_sequencer_up(5).is_err());
    }

    #[test]
    fn test_payload_change_reregisters() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();
        timeline.add_block(0, 0).unwrap();

        let payload = TriggerPayload::new("E2".parse().unwrap(), Default::default(), 64);
        timeline.set_sequencer_payload(0, payload).unwrap();

        let handle = timeline.sequencers()[0].handle();
        let regs = timeline.clock().registrations_for(handle);
        assert_eq!(regs.len(), 2);
        assert!(regs.iter().any(|r| r.action == crate::sequencer::clock::ClockAction::Start(payload)));
    }

    #[test]
    fn test_add_sequencer_surfaces_phantom_pair_failure() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 2, ["A"]).unwrap();
        timeline.set_sequencer_loop(true).unwrap();
        timeline.clock_mut().set_capacity(Some(2));

        assert_eq!(
            timeline.add_sequencer("B"),
            Err(TimelineError::Clock(ClockError::CapacityExceeded { capacity: 2 }))
        );
        assert_eq!(timeline.sequencer_count(), 1);
        assert_eq!(timeline.clock().registrations().len(), 2);

        timeline.clock_mut().set_capacity(None);
        assert_eq!(timeline.add_sequencer("B"), Ok(1));
        assert_eq!(schedule(&timeline, 1), pairs(&[2]));
    }

    #[test]
    fn test_seek_and_current_bar() {
        let mut timeline = Timeline::new(RecordingClock::new(), 4).unwrap();
        timeline.seek_to_bar(3).unwrap();
        assert_eq!(timeline.current_bar(), 3);
        assert!(timeline.seek_to_bar(4).is_err());
    }

    #[test]
    fn test_clock_failure_is_surfaced_and_recoverable() {
        let mut timeline = Timeline::with_sequencers(RecordingClock::new(), 4, ["A"]).unwrap();
        timeline.add_block(0, 2).unwrap();
        timeline.clock_mut().set_capacity(Some(3));

        // Full rebuild needs four registrations
        let err = timeline.add_block(0, 0).unwrap_err();
        assert!(matches!(err, TimelineError::Clock(ClockError::CapacityExceeded { .. })));

        timeline.clock_mut().set_capacity(None);
        timeline.reschedule_sequencer(0).unwrap();
        assert_eq!(schedule(&timeline, 0), pairs(&[0, 2]));
    }

    #[test]
    fn test_notifications() {
        let (tx, mut rx) = create_notification_channel(16);
        let mut timeline = Timeline::new(RecordingClock::new(), 4).unwrap();
        timeline.set_notifier(tx);

        timeline.add_sequencer("A").unwrap();
        timeline.add_block(0, 1).unwrap();
        timeline.remove_block(0, 1).unwrap();
        timeline.set_length(5).unwrap();

        let changes: Vec<TimelineChange> = std::iter::from_fn(|| rx.try_pop()).map(|n| n.change).collect();
        assert_eq!(
            changes,
            vec![
                TimelineChange::SequencerAdded { index: 0 },
                TimelineChange::BlockAdded { track: 0, bar: 1 },
                TimelineChange::BlockRemoved { track: 0, bar: 1 },
                TimelineChange::LengthChanged { old: 4, new: 5 },
            ]
        );
    }

    #[test]
    fn test_drop_disposes_sequencers() {
        let mut clock = RecordingClock::new();
        let handle;
        {
            let mut timeline = Timeline::with_sequencers(&mut clock, 4, ["A"]).unwrap();
            timeline.add_block(0, 0).unwrap();
            handle = timeline.sequencers()[0].handle();
        }
        assert!(clock.registrations().is_empty());
        assert!(clock.was_released(handle));
    }
}
