// MIDI event types produced by voices

/// Note-level MIDI messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

/// MIDI event with musical timing
/// `ticks_from_now` is the delay, in transport ticks, before the event applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEventTimed {
    pub event: MidiEvent,
    pub ticks_from_now: u64,
}

impl MidiEventTimed {
    pub fn now(event: MidiEvent) -> Self {
        Self {
            event,
            ticks_from_now: 0,
        }
    }

    pub fn after(event: MidiEvent, ticks: u64) -> Self {
        Self {
            event,
            ticks_from_now: ticks,
        }
    }
}

impl MidiEvent {
    pub fn note(&self) -> u8 {
        match self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note } => *note,
        }
    }

    /// Encode as a raw 3-byte MIDI message on `channel` (0-15)
    pub fn to_bytes(&self, channel: u8) -> [u8; 3] {
        let channel = channel & 0x0F;
        match *self {
            MidiEvent::NoteOn { note, velocity } => [0x90 | channel, note & 0x7F, velocity & 0x7F],
            MidiEvent::NoteOff { note } => [0x80 | channel, note & 0x7F, 0],
        }
    }

    /// Parse a raw MIDI message
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        match bytes[0] & 0xF0 {
            0x90 => {
                // Velocity 0 = Note Off
                if bytes[2] == 0 {
                    Some(MidiEvent::NoteOff { note: bytes[1] })
                } else {
                    Some(MidiEvent::NoteOn {
                        note: bytes[1],
                        velocity: bytes[2],
                    })
                }
            }
            0x80 => Some(MidiEvent::NoteOff { note: bytes[1] }),
            _ => None,
        }
    }
}
