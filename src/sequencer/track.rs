// Sequencer - one track of the timeline
// Holds the activation map and forwards start/stop scheduling to the clock

use crate::sequencer::activation::ActivationMap;
use crate::sequencer::clock::{Clock, ClockAction, ClockError, RegistrationId, SequencerHandle};
use crate::sequencer::note::TriggerPayload;
use crate::sequencer::time::BarTime;

/// One track: a name, a bar-indexed activation map and a clock identity
///
/// The sequencer does not own the clock; every scheduling primitive takes it
/// as an argument so the timeline decides when registrations change.
#[derive(Debug)]
pub struct Sequencer {
    name: String,
    handle: SequencerHandle,
    events: ActivationMap,
    payload: TriggerPayload,
}

impl Sequencer {
    /// Create an all-inactive sequencer of `length` bars
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self::with_payload(name, length, TriggerPayload::default())
    }

    pub fn with_payload(name: impl Into<String>, length: usize, payload: TriggerPayload) -> Self {
        Self {
            name: name.into(),
            handle: SequencerHandle::next(),
            events: ActivationMap::new(length),
            payload,
        }
    }

    /// Rebuild a sequencer from a saved activation state under `handle`
    pub(crate) fn restore(
        handle: SequencerHandle,
        name: String,
        events: ActivationMap,
        payload: TriggerPayload,
    ) -> Self {
        Self {
            name,
            handle,
            events,
            payload,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn handle(&self) -> SequencerHandle {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Read-only view of the activation map
    pub fn events(&self) -> &ActivationMap {
        &self.events
    }

    pub fn is_active(&self, bar: usize) -> bool {
        self.events.is_active(bar)
    }

    pub fn payload(&self) -> TriggerPayload {
        self.payload
    }

    /// Change what the track plays; takes effect on the next rebuild
    pub fn set_payload(&mut self, payload: TriggerPayload) {
        self.payload = payload;
    }

    pub(crate) fn events_mut(&mut self) -> &mut ActivationMap {
        &mut self.events
    }

    pub(crate) fn set_length(&mut self, length: usize) {
        self.events.resize(length);
    }

    /// Register a "begin window" action at `at`
    pub fn start<C: Clock + ?Sized>(
        &self,
        clock: &mut C,
        at: BarTime,
        payload: TriggerPayload,
    ) -> Result<RegistrationId, ClockError> {
        log::trace!("{} '{}': start @ {}", self.handle, self.name, at);
        clock.register_at(at, self.handle, ClockAction::Start(payload))
    }

    /// Register an "end window" action at `at`
    pub fn stop<C: Clock + ?Sized>(
        &self,
        clock: &mut C,
        at: BarTime,
    ) -> Result<RegistrationId, ClockError> {
        log::trace!("{} '{}': stop @ {}", self.handle, self.name, at);
        clock.register_at(at, self.handle, ClockAction::Stop)
    }

    /// Register the start/stop pair covering `[bar, bar + 1)`
    pub fn schedule_bar<C: Clock + ?Sized>(&self, clock: &mut C, bar: u32) -> Result<(), ClockError> {
        self.start(clock, BarTime::at_bar(bar), self.payload)?;
        self.stop(clock, BarTime::at_bar(bar + 1))?;
        Ok(())
    }

    /// Cancel every pending registration; the activation map is untouched
    pub fn reset_sequences<C: Clock + ?Sized>(&self, clock: &mut C) {
        log::trace!("{} '{}': reset sequences", self.handle, self.name);
        clock.cancel_all(self.handle);
    }

    /// Cancel registrations and release everything else the clock holds for us
    pub fn dispose<C: Clock + ?Sized>(&self, clock: &mut C) {
        log::debug!("{} '{}': dispose", self.handle, self.name);
        self.reset_sequences(clock);
        clock.release(self.handle);
    }
}
