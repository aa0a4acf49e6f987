// Clock - the contract between the scheduling core and a transport
//
// The timeline never talks to a concrete transport. It registers bar-aligned
// start/stop actions through the `Clock` trait and cancels them in bulk per
// sequencer. `Transport` is the playing implementation, `RecordingClock` only
// records what was registered.

use crate::sequencer::note::TriggerPayload;
use crate::sequencer::time::BarTime;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a sequencer towards the clock
///
/// Registrations are keyed to this handle, never to a track's position,
/// so reordering tracks leaves registrations untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequencerHandle(u64);

/// Global handle generator (atomic for thread-safety)
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl SequencerHandle {
    /// Allocate a fresh, process-unique handle
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequencerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

/// Identifier returned for every accepted registration
pub type RegistrationId = u64;

/// What happens when the cursor reaches a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockAction {
    /// Open a playback window: trigger the voice's attack
    Start(TriggerPayload),
    /// Close a playback window: release the voice
    Stop,
}

impl ClockAction {
    pub fn is_start(&self) -> bool {
        matches!(self, ClockAction::Start(_))
    }
}

/// A clock-held record: "invoke this action when the cursor reaches `time`"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub id: RegistrationId,
    pub time: BarTime,
    pub handle: SequencerHandle,
    pub action: ClockAction,
}

/// Errors a clock can report back to the scheduling core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("registration table full ({capacity} entries)")]
    CapacityExceeded { capacity: usize },

    #[error("invalid loop end: {bars} bars")]
    InvalidLoopEnd { bars: u32 },
}

/// Transport-side operations the scheduling core relies on
pub trait Clock {
    /// Move the loop end to the downbeat of `bars`
    fn set_loop_end(&mut self, bars: u32) -> Result<(), ClockError>;

    /// Current cursor position
    fn position(&self) -> BarTime;

    /// Move the cursor
    fn seek(&mut self, time: BarTime);

    /// Register `action` for `handle` at `time`
    ///
    /// Every call adds a registration; the clock does not deduplicate.
    fn register_at(
        &mut self,
        time: BarTime,
        handle: SequencerHandle,
        action: ClockAction,
    ) -> Result<RegistrationId, ClockError>;

    /// Cancel every pending registration of `handle`
    ///
    /// Unknown handles and already-fired registrations are not an error.
    fn cancel_all(&mut self, handle: SequencerHandle);

    /// Release everything the clock holds for `handle`
    ///
    /// A clock may set resources aside instead of dropping them, so that a
    /// sequencer restored under the same handle can take them back.
    fn release(&mut self, handle: SequencerHandle) {
        self.cancel_all(handle);
    }

    /// Take back what `release` set aside for `handle`
    fn reclaim(&mut self, _handle: SequencerHandle) {}
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn set_loop_end(&mut self, bars: u32) -> Result<(), ClockError> {
        (**self).set_loop_end(bars)
    }

    fn position(&self) -> BarTime {
        (**self).position()
    }

    fn seek(&mut self, time: BarTime) {
        (**self).seek(time)
    }

    fn register_at(
        &mut self,
        time: BarTime,
        handle: SequencerHandle,
        action: ClockAction,
    ) -> Result<RegistrationId, ClockError> {
        (**self).register_at(time, handle, action)
    }

    fn cancel_all(&mut self, handle: SequencerHandle) {
        (**self).cancel_all(handle)
    }

    fn release(&mut self, handle: SequencerHandle) {
        (**self).release(handle)
    }

    fn reclaim(&mut self, handle: SequencerHandle) {
        (**self).reclaim(handle)
    }
}

/// In-memory clock that records registrations instead of playing them
///
/// Useful for tests and for driving a timeline without a running transport.
#[derive(Debug, Default)]
pub struct RecordingClock {
    registrations: Vec<Registration>,
    loop_end: Option<u32>,
    position: BarTime,
    capacity: Option<usize>,
    next_id: RegistrationId,
    released: Vec<SequencerHandle>,
    reclaimed: Vec<SequencerHandle>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that refuses registrations beyond `capacity` live entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Registrations of one sequencer in registration order
    pub fn registrations_for(&self, handle: SequencerHandle) -> Vec<Registration> {
        self.registrations
            .iter()
            .filter(|r| r.handle == handle)
            .copied()
            .collect()
    }

    /// `(bar, is_start)` pairs of one sequencer, sorted
    pub fn schedule_for(&self, handle: SequencerHandle) -> Vec<(u32, bool)> {
        let mut schedule: Vec<(u32, bool)> = self
            .registrations
            .iter()
            .filter(|r| r.handle == handle)
            .map(|r| (r.time.bar, r.action.is_start()))
            .collect();
        schedule.sort_unstable();
        schedule
    }

    pub fn loop_end(&self) -> Option<u32> {
        self.loop_end
    }

    /// Loop end rendered as `"<bar>:0:0"`
    pub fn loop_end_time(&self) -> Option<String> {
        self.loop_end.map(|bars| BarTime::at_bar(bars).to_string())
    }

    pub fn was_released(&self, handle: SequencerHandle) -> bool {
        self.released.contains(&handle)
    }

    pub fn was_reclaimed(&self, handle: SequencerHandle) -> bool {
        self.reclaimed.contains(&handle)
    }
}

impl Clock for RecordingClock {
    fn set_loop_end(&mut self, bars: u32) -> Result<(), ClockError> {
        if bars == 0 {
            return Err(ClockError::InvalidLoopEnd { bars });
        }
        self.loop_end = Some(bars);
        Ok(())
    }

    fn position(&self) -> BarTime {
        self.position
    }

    fn seek(&mut self, time: BarTime) {
        self.position = time;
    }

    fn register_at(
        &mut self,
        time: BarTime,
        handle: SequencerHandle,
        action: ClockAction,
    ) -> Result<RegistrationId, ClockError> {
        if let Some(capacity) = self.capacity {
            if self.registrations.len() >= capacity {
                return Err(ClockError::CapacityExceeded { capacity });
            }
        }
        self.next_id += 1;
        let id = self.next_id;
        self.registrations.push(Registration {
            id,
            time,
            handle,
            action,
        });
        Ok(id)
    }

    fn cancel_all(&mut self, handle: SequencerHandle) {
        self.registrations.retain(|r| r.handle != handle);
    }

    fn release(&mut self, handle: SequencerHandle) {
        self.cancel_all(handle);
        self.released.push(handle);
    }

    fn reclaim(&mut self, handle: SequencerHandle) {
        self.reclaimed.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = SequencerHandle::next();
        let b = SequencerHandle::next();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_recording_clock_registers_and_cancels() {
        let mut clock = RecordingClock::new();
        let a = SequencerHandle::next();
        let b = SequencerHandle::next();

        clock
            .register_at(BarTime::at_bar(1), a, ClockAction::Start(TriggerPayload::default()))
            .unwrap();
        clock.register_at(BarTime::at_bar(2), a, ClockAction::Stop).unwrap();
        clock.register_at(BarTime::at_bar(0), b, ClockAction::Stop).unwrap();

        assert_eq!(clock.schedule_for(a), vec![(1, true), (2, false)]);

        clock.cancel_all(a);
        assert!(clock.schedule_for(a).is_empty());
        assert_eq!(clock.registrations().len(), 1);

        // Cancelling again is a no-op
        clock.cancel_all(a);
        assert_eq!(clock.registrations().len(), 1);
    }

    #[test]
    fn test_recording_clock_capacity() {
        let mut clock = RecordingClock::with_capacity(1);
        let handle = SequencerHandle::next();

        assert!(clock.register_at(BarTime::at_bar(0), handle, ClockAction::Stop).is_ok());
        assert_eq!(
            clock.register_at(BarTime::at_bar(1), handle, ClockAction::Stop),
            Err(ClockError::CapacityExceeded { capacity: 1 })
        );
    }

    #[test]
    fn test_recording_clock_loop_end() {
        let mut clock = RecordingClock::new();
        assert!(clock.set_loop_end(0).is_err());
        clock.set_loop_end(6).unwrap();
        assert_eq!(clock.loop_end_time().as_deref(), Some("6:0:0"));
    }

    #[test]
    fn test_release_is_recorded() {
        let mut clock = RecordingClock::new();
        let handle = SequencerHandle::next();
        clock.register_at(BarTime::at_bar(0), handle, ClockAction::Stop).unwrap();

        clock.release(handle);
        assert!(clock.was_released(handle));
        assert!(clock.registrations_for(handle).is_empty());
    }
}
