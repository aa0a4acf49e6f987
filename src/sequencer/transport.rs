// Transport - Playback control, loop region and registration firing
// Advances a tick cursor, fires start/stop registrations it crosses and
// routes them to the voice attached to each sequencer handle

use super::clock::{Clock, ClockAction, ClockError, Registration, RegistrationId, SequencerHandle};
use super::time::{BarTime, Tempo, TimeSignature};
use crate::synth::voice::Voice;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Transport state (play/stop/pause)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// Check if transport is stopped or paused
    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped | TransportState::Paused)
    }
}

/// Shared transport state
/// Lock-free via atomics, so a display thread can follow the cursor while
/// the owner edits registrations
#[derive(Debug, Default)]
pub struct SharedTransportState {
    playing: AtomicBool,
    paused: AtomicBool,
    position_ticks: AtomicU64,
    loop_enabled: AtomicBool,
    loop_start_ticks: AtomicU64,
    loop_end_ticks: AtomicU64,
}

impl SharedTransportState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get current transport state
    pub fn state(&self) -> TransportState {
        if self.playing.load(Ordering::Relaxed) {
            TransportState::Playing
        } else if self.paused.load(Ordering::Relaxed) {
            TransportState::Paused
        } else {
            TransportState::Stopped
        }
    }

    /// Get current position in ticks
    pub fn position_ticks(&self) -> u64 {
        self.position_ticks.load(Ordering::Relaxed)
    }

    pub fn set_position_ticks(&self, ticks: u64) {
        self.position_ticks.store(ticks, Ordering::Relaxed);
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::Relaxed)
    }

    pub fn set_loop_enabled(&self, enabled: bool) {
        self.loop_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Get loop region (start, end) in ticks
    pub fn loop_region(&self) -> (u64, u64) {
        (
            self.loop_start_ticks.load(Ordering::Relaxed),
            self.loop_end_ticks.load(Ordering::Relaxed),
        )
    }

    fn set_loop_region(&self, start_ticks: u64, end_ticks: u64) {
        self.loop_start_ticks.store(start_ticks, Ordering::Relaxed);
        self.loop_end_ticks.store(end_ticks, Ordering::Relaxed);
    }
}

/// Registration order inside the table: time first, then stops before
/// starts so a retriggered bar releases before it attacks again
type SlotKey = (u64, u8, RegistrationId);

/// Transport controller
/// Owns the musical time context (tempo, time signature), the
/// registration table and the voices registrations are routed to
pub struct Transport {
    shared_state: Arc<SharedTransportState>,
    tempo: Tempo,
    time_signature: TimeSignature,
    registrations: BTreeMap<SlotKey, Registration>,
    voices: HashMap<SequencerHandle, Box<dyn Voice>>,
    /// Voices of released sequencers, kept until reclaimed or dropped
    parked: HashMap<SequencerHandle, Box<dyn Voice>>,
    capacity: Option<usize>,
    next_id: RegistrationId,
    fired_total: u64,
    /// The pass in progress began at a wrap
    after_wrap: bool,
}

impl Transport {
    /// Create a stopped transport in 4/4 at 120 BPM
    pub fn new() -> Self {
        Self::with_timing(Tempo::default(), TimeSignature::default())
    }

    pub fn with_timing(tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            shared_state: SharedTransportState::new(),
            tempo,
            time_signature,
            registrations: BTreeMap::new(),
            voices: HashMap::new(),
            parked: HashMap::new(),
            capacity: None,
            next_id: 0,
            fired_total: 0,
            after_wrap: false,
        }
    }

    /// Limit the number of live registrations
    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    /// Get shared state (for display threads)
    pub fn shared_state(&self) -> Arc<SharedTransportState> {
        Arc::clone(&self.shared_state)
    }

    pub fn state(&self) -> TransportState {
        self.shared_state.state()
    }

    pub fn position_ticks(&self) -> u64 {
        self.shared_state.position_ticks()
    }

    /// Bar the cursor is currently in
    pub fn current_bar(&self) -> u32 {
        self.position().bar
    }

    pub fn play(&mut self) {
        self.shared_state.playing.store(true, Ordering::Relaxed);
        self.shared_state.paused.store(false, Ordering::Relaxed);
    }

    /// Stop (reset position to 0, silence every voice)
    pub fn stop(&mut self) {
        self.shared_state.playing.store(false, Ordering::Relaxed);
        self.shared_state.paused.store(false, Ordering::Relaxed);
        self.shared_state.set_position_ticks(0);
        self.after_wrap = false;
        for voice in self.voices.values_mut() {
            voice.trigger_stop();
        }
    }

    /// Pause (keep current position)
    pub fn pause(&mut self) {
        self.shared_state.playing.store(false, Ordering::Relaxed);
        self.shared_state.paused.store(true, Ordering::Relaxed);
    }

    /// Toggle play/pause
    pub fn toggle_play(&mut self) {
        if self.state().is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    pub fn time_signature(&self) -> &TimeSignature {
        &self.time_signature
    }

    /// Changing the signature moves every bar boundary, so the table is
    /// re-keyed and the cursor keeps its bar:beat position
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        let position = self.position();
        let (start, end) = self.shared_state.loop_region();
        let loop_start = BarTime::from_ticks(start, &self.time_signature);
        let loop_end = BarTime::from_ticks(end, &self.time_signature);

        self.time_signature = time_signature;
        self.shared_state
            .set_position_ticks(position.to_ticks(&self.time_signature));
        self.shared_state.set_loop_region(
            loop_start.to_ticks(&self.time_signature),
            loop_end.to_ticks(&self.time_signature),
        );

        let registrations = std::mem::take(&mut self.registrations);
        for registration in registrations.into_values() {
            let key = self.slot_key(&registration);
            self.registrations.insert(key, registration);
        }
    }

    /// Loop region as bar times
    pub fn loop_region(&self) -> (BarTime, BarTime) {
        let (start, end) = self.shared_state.loop_region();
        (
            BarTime::from_ticks(start, &self.time_signature),
            BarTime::from_ticks(end, &self.time_signature),
        )
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.shared_state.is_loop_enabled()
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.shared_state.set_loop_enabled(enabled);
    }

    /// Route fired registrations of `handle` to `voice`
    pub fn connect_voice(&mut self, handle: SequencerHandle, voice: Box<dyn Voice>) {
        if let Some(mut previous) = self.voices.insert(handle, voice) {
            previous.trigger_stop();
        }
    }

    pub fn disconnect_voice(&mut self, handle: SequencerHandle) -> Option<Box<dyn Voice>> {
        match self.voices.remove(&handle) {
            Some(mut voice) => {
                voice.trigger_stop();
                Some(voice)
            }
            None => self.parked.remove(&handle),
        }
    }

    pub fn has_voice(&self, handle: SequencerHandle) -> bool {
        self.voices.contains_key(&handle)
    }

    /// Whether a released sequencer's voice is waiting to be reclaimed
    pub fn has_parked_voice(&self, handle: SequencerHandle) -> bool {
        self.parked.contains_key(&handle)
    }

    /// Drop every voice set aside by `release`; returns how many went
    ///
    /// Call once released sequencers can no longer come back, for example
    /// after clearing the undo history.
    pub fn drop_parked_voices(&mut self) -> usize {
        let count = self.parked.len();
        self.parked.clear();
        count
    }

    /// Live registrations in firing order
    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.values()
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// `(bar, is_start)` pairs of one sequencer, sorted
    pub fn schedule_for(&self, handle: SequencerHandle) -> Vec<(u32, bool)> {
        let mut schedule: Vec<(u32, bool)> = self
            .registrations
            .values()
            .filter(|r| r.handle == handle)
            .map(|r| (r.time.bar, r.action.is_start()))
            .collect();
        schedule.sort_unstable();
        schedule
    }

    /// Total number of registrations fired since creation
    pub fn fired_total(&self) -> u64 {
        self.fired_total
    }

    /// Advance by wall-clock time; returns the number of fired registrations
    pub fn advance_seconds(&mut self, seconds: f64) -> usize {
        let ticks = self.tempo.seconds_to_ticks(seconds);
        self.advance_ticks(ticks)
    }

    /// Advance the cursor by `delta` ticks while playing
    ///
    /// Registrations in `[cursor, cursor + delta)` fire in order. Registrations
    /// at or past the loop end belong to the pass after a wrap: they fire one
    /// loop span earlier, so a window opening at the loop end stays open into
    /// the next pass instead of closing on the spot.
    pub fn advance_ticks(&mut self, delta: u64) -> usize {
        if !self.state().is_playing() || delta == 0 {
            return 0;
        }

        let (loop_start, loop_end) = self.shared_state.loop_region();
        let looping = self.shared_state.is_loop_enabled() && loop_end > loop_start;
        let span = loop_end.saturating_sub(loop_start);

        let mut cursor = self.shared_state.position_ticks();
        let mut remaining = delta;
        let mut fired = 0;

        if looping && cursor >= loop_end {
            cursor = loop_start;
        }

        loop {
            let target = cursor.saturating_add(remaining);
            let carried = (looping && self.after_wrap).then_some(span);

            if looping && target >= loop_end {
                fired += self.fire_window(cursor, loop_end, carried, true);
                remaining = target - loop_end;
                cursor = loop_start;
                self.after_wrap = true;
                if remaining == 0 {
                    break;
                }
            } else {
                fired += self.fire_window(cursor, target, carried, false);
                cursor = target;
                break;
            }
        }

        self.shared_state.set_position_ticks(cursor);
        self.fired_total += fired as u64;
        fired
    }

    /// Fire registrations the cursor crosses sweeping `[from, to)`
    ///
    /// With `carried = Some(span)`, registrations in `[from + span, to + span)`
    /// are due too, at their tick minus `span`. A sweep that `closes_pass`
    /// also takes the carried registration landing exactly on the loop end.
    fn fire_window(&mut self, from: u64, to: u64, carried: Option<u64>, closes_pass: bool) -> usize {
        let mut due: Vec<(SlotKey, Registration)> = Vec::new();

        if to > from {
            let lower: SlotKey = (from, 0, 0);
            let upper: SlotKey = (to, 0, 0);
            due.extend(self.registrations.range(lower..upper).map(|(k, r)| (*k, *r)));
        }

        if let Some(span) = carried {
            let lower: SlotKey = (from.saturating_add(span), 0, 0);
            let upper = if closes_pass {
                Bound::Included((to.saturating_add(span), u8::MAX, RegistrationId::MAX))
            } else {
                Bound::Excluded((to.saturating_add(span), 0, 0))
            };
            let bounds: (Bound<SlotKey>, Bound<SlotKey>) = (Bound::Included(lower), upper);
            if to > from || closes_pass {
                due.extend(
                    self.registrations
                        .range(bounds)
                        .map(|(&(tick, order, id), r)| ((tick - span, order, id), *r)),
                );
            }
        }

        due.sort_unstable_by_key(|(key, _)| *key);

        for (_, registration) in &due {
            log::trace!(
                "fire {:?} for {} at {}",
                registration.action,
                registration.handle,
                registration.time
            );
            if let Some(voice) = self.voices.get_mut(&registration.handle) {
                match registration.action {
                    ClockAction::Start(payload) => voice.trigger_start(payload),
                    ClockAction::Stop => voice.trigger_stop(),
                }
            }
        }

        due.len()
    }

    fn slot_key(&self, registration: &Registration) -> SlotKey {
        let order = if registration.action.is_start() { 1 } else { 0 };
        (
            registration.time.to_ticks(&self.time_signature),
            order,
            registration.id,
        )
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Transport {
    fn set_loop_end(&mut self, bars: u32) -> Result<(), ClockError> {
        let (start, _) = self.shared_state.loop_region();
        let end = BarTime::at_bar(bars).to_ticks(&self.time_signature);
        if bars == 0 || end <= start {
            return Err(ClockError::InvalidLoopEnd { bars });
        }

        self.shared_state.set_loop_region(start, end);
        self.shared_state.set_loop_enabled(true);
        log::debug!("loop end set to {}", BarTime::at_bar(bars));
        Ok(())
    }

    fn position(&self) -> BarTime {
        BarTime::from_ticks(self.shared_state.position_ticks(), &self.time_signature)
    }

    fn seek(&mut self, time: BarTime) {
        self.shared_state
            .set_position_ticks(time.to_ticks(&self.time_signature));
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
        let registration = Registration {
            id: self.next_id,
            time,
            handle,
            action,
        };
        let key = self.slot_key(&registration);
        self.registrations.insert(key, registration);
        Ok(registration.id)
    }

    fn cancel_all(&mut self, handle: SequencerHandle) {
        self.registrations.retain(|_, r| r.handle != handle);
    }

    /// Cancels every registration and parks the voice, silenced
    fn release(&mut self, handle: SequencerHandle) {
        self.cancel_all(handle);
        if let Some(mut voice) = self.voices.remove(&handle) {
            voice.trigger_stop();
            self.parked.insert(handle, voice);
        }
    }

    fn reclaim(&mut self, handle: SequencerHandle) {
        if let Some(voice) = self.parked.remove(&handle) {
            log::debug!("{} reclaims its voice", handle);
            self.voices.insert(handle, voice);
        }
    }
}
