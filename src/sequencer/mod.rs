// Sequencer module
// Bar grid timeline, clock contract, and the transport that plays it

pub mod activation;
pub mod clock;
pub mod note;
pub mod time;
pub mod timeline;
pub mod track;
pub mod transport;

pub use activation::ActivationMap;
pub use clock::{Clock, ClockAction, ClockError, RecordingClock, Registration, RegistrationId, SequencerHandle};
pub use note::{NoteParseError, NoteValue, Pitch, TriggerPayload};
pub use time::{BarTime, InvalidTimeSignature, ParseBarTimeError, Tempo, TimeSignature};
pub use timeline::{SequencerSnapshot, Timeline, TimelineError, TimelineResult};
pub use track::Sequencer;
pub use transport::{SharedTransportState, Transport, TransportState};
