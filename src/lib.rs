// Block Timeline - Library exports for the demo binary, tests and benchmarks

pub mod command;
pub mod config;
pub mod messaging;
pub mod midi;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use command::{CommandManager, SessionState, UndoableCommand};
pub use config::{ConfigError, TimelineConfig};
pub use messaging::channels::{create_midi_channel, create_notification_channel};
pub use messaging::notification::{Notification, TimelineChange};
pub use midi::event::{MidiEvent, MidiEventTimed};
pub use sequencer::{
    BarTime, Clock, ClockAction, ClockError, RecordingClock, Sequencer, SequencerHandle, Tempo,
    TimeSignature, Timeline, TimelineError, Transport, TransportState, TriggerPayload,
};
pub use synth::voice::{MidiVoice, Voice};
