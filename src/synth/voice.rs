// Voice - the sound-producing end of a fired registration

use crate::messaging::channels::MidiProducer;
use crate::midi::event::{MidiEvent, MidiEventTimed};
use crate::sequencer::note::TriggerPayload;
use ringbuf::traits::Producer;

/// Receives attack/release triggers from the transport
///
/// A voice knows nothing about bars or registrations; it is only ever called
/// when a start or stop registration of its sequencer fires.
pub trait Voice: Send {
    /// Attack `payload.pitch`, releasing by itself after `payload.duration`
    fn trigger_start(&mut self, payload: TriggerPayload);

    /// Release whatever is still sounding
    fn trigger_stop(&mut self);
}

/// Voice that turns triggers into MIDI note messages on a ring buffer
pub struct MidiVoice {
    output: MidiProducer,
    sounding: Option<u8>,
    dropped: u64,
}

impl MidiVoice {
    pub fn new(output: MidiProducer) -> Self {
        Self {
            output,
            sounding: None,
            dropped: 0,
        }
    }

    /// Note currently held by this voice
    pub fn sounding(&self) -> Option<u8> {
        self.sounding
    }

    /// Number of events lost because the ring buffer was full
    pub fn dropped_events(&self) -> u64 {
        self.dropped
    }

    fn push(&mut self, event: MidiEventTimed) {
        if self.output.try_push(event).is_err() {
            self.dropped += 1;
            log::warn!("MIDI buffer full, {:?} dropped", event.event);
        }
    }
}

impl Voice for MidiVoice {
    fn trigger_start(&mut self, payload: TriggerPayload) {
        // Retrigger: release the previous note first
        if let Some(note) = self.sounding.take() {
            self.push(MidiEventTimed::now(MidiEvent::NoteOff { note }));
        }

        let note = payload.pitch.midi();
        self.push(MidiEventTimed::now(MidiEvent::NoteOn {
            note,
            velocity: payload.velocity,
        }));
        self.push(MidiEventTimed::after(
            MidiEvent::NoteOff { note },
            payload.duration.to_ticks(),
        ));
        self.sounding = Some(note);
    }

    fn trigger_stop(&mut self) {
        if let Some(note) = self.sounding.take() {
            self.push(MidiEventTimed::now(MidiEvent::NoteOff { note }));
        }
    }
}
