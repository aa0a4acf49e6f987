// MIDI - note events emitted by voices

pub mod event;

pub use event::{MidiEvent, MidiEventTimed};
