// Synth - voices driven by fired transport registrations

pub mod voice;

pub use voice::{MidiVoice, Voice};
