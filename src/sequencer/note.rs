// Note representation for the sequencer
// What a track plays when one of its windows opens: pitch, length and velocity

use crate::sequencer::time::BarTime;
use std::fmt;
use std::str::FromStr;

/// MIDI note number (0-127, where 60 = C4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch(u8);

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl Pitch {
    /// Middle C
    pub const C4: Pitch = Pitch(60);

    pub fn new(midi: u8) -> Option<Self> {
        (midi <= 127).then_some(Self(midi))
    }

    pub fn midi(&self) -> u8 {
        self.0
    }

    /// Frequency in Hz (A4 = 440)
    pub fn frequency(&self) -> f32 {
        440.0 * 2f32.powf((self.0 as f32 - 69.0) / 12.0)
    }
}

impl Default for Pitch {
    fn default() -> Self {
        Self::C4
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = NOTE_NAMES[(self.0 % 12) as usize];
        let octave = self.0 as i16 / 12 - 1;
        write!(f, "{}{}", name, octave)
    }
}

/// Error for note names and durations that cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteParseError {
    #[error("invalid note name: {0}")]
    InvalidPitch(String),

    #[error("invalid note duration: {0}")]
    InvalidDuration(String),
}

impl FromStr for Pitch {
    type Err = NoteParseError;

    /// Parses scientific pitch notation such as `C4`, `F#3` or `Bb-1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || NoteParseError::InvalidPitch(s.to_string());
        let s = s.trim();
        let mut chars = s.chars();

        let letter = chars.next().ok_or_else(err)?.to_ascii_uppercase();
        let base: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(err()),
        };

        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };

        let octave: i32 = octave_str.parse().map_err(|_| err())?;
        let midi = (octave + 1) * 12 + base + accidental;

        if !(0..=127).contains(&midi) {
            return Err(err());
        }

        Ok(Self(midi as u8))
    }
}

impl TryFrom<String> for Pitch {
    type Error = NoteParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(value: Pitch) -> Self {
        value.to_string()
    }
}

/// Note length in musical notation (`"1n"`, `"4n"`, `"8n"`...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    #[default]
    Eighth,
    Sixteenth,
}

impl NoteValue {
    /// Divisor of a whole note
    pub fn divisor(&self) -> u64 {
        match self {
            NoteValue::Whole => 1,
            NoteValue::Half => 2,
            NoteValue::Quarter => 4,
            NoteValue::Eighth => 8,
            NoteValue::Sixteenth => 16,
        }
    }

    /// Duration in ticks
    pub fn to_ticks(&self) -> u64 {
        BarTime::TICKS_PER_QUARTER * 4 / self.divisor()
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n", self.divisor())
    }
}

impl FromStr for NoteValue {
    type Err = NoteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1n" => Ok(NoteValue::Whole),
            "2n" => Ok(NoteValue::Half),
            "4n" => Ok(NoteValue::Quarter),
            "8n" => Ok(NoteValue::Eighth),
            "16n" => Ok(NoteValue::Sixteenth),
            other => Err(NoteParseError::InvalidDuration(other.to_string())),
        }
    }
}

impl TryFrom<String> for NoteValue {
    type Error = NoteParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteValue> for String {
    fn from(value: NoteValue) -> Self {
        value.to_string()
    }
}

/// Data carried by a "start" registration and handed to the voice when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerPayload {
    pub pitch: Pitch,
    pub duration: NoteValue,
    pub velocity: u8,
}

impl TriggerPayload {
    pub fn new(pitch: Pitch, duration: NoteValue, velocity: u8) -> Self {
        Self {
            pitch,
            duration,
            velocity: velocity.min(127),
        }
    }
}

impl Default for TriggerPayload {
    fn default() -> Self {
        Self::new(Pitch::C4, NoteValue::Eighth, 100)
    }
}
