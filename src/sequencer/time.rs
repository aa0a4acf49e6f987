// Musical time - bar-aligned positions, tempo and time signature
// Handles conversion between ticks, seconds and bars:beats:sixteenths

use std::fmt;
use std::str::FromStr;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature::new(4, 4)
///
/// Fields are private: every value has a positive numerator and a power-of-two
/// denominator up to 64, so tick conversions never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "TimeSignatureFields", into = "TimeSignatureFields")]
pub struct TimeSignature {
    numerator: u8,   // Beats per bar
    denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

/// Rejected numerator/denominator pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported time signature {numerator}/{denominator}")]
pub struct InvalidTimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

/// Serialized shape of a time signature, checked on the way in
#[derive(serde::Serialize, serde::Deserialize)]
struct TimeSignatureFields {
    numerator: u8,
    denominator: u8,
}

impl TryFrom<TimeSignatureFields> for TimeSignature {
    type Error = InvalidTimeSignature;

    fn try_from(fields: TimeSignatureFields) -> Result<Self, Self::Error> {
        Self::try_new(fields.numerator, fields.denominator)
    }
}

impl From<TimeSignature> for TimeSignatureFields {
    fn from(time_signature: TimeSignature) -> Self {
        Self {
            numerator: time_signature.numerator,
            denominator: time_signature.denominator,
        }
    }
}

impl TimeSignature {
    /// Creates a new time signature
    pub fn new(numerator: u8, denominator: u8) -> Self {
        assert!(numerator > 0, "Time signature numerator must be > 0");
        assert!(
            denominator.is_power_of_two() && denominator <= 64,
            "Time signature denominator must be a power of 2 up to 64"
        );
        Self {
            numerator,
            denominator,
        }
    }

    /// Non-panicking `new`
    pub fn try_new(numerator: u8, denominator: u8) -> Result<Self, InvalidTimeSignature> {
        if numerator > 0 && denominator.is_power_of_two() && denominator <= 64 {
            Ok(Self {
                numerator,
                denominator,
            })
        } else {
            Err(InvalidTimeSignature {
                numerator,
                denominator,
            })
        }
    }

    pub fn numerator(&self) -> u8 {
        self.numerator
    }

    pub fn denominator(&self) -> u8 {
        self.denominator
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    /// Common 3/4 time signature
    pub fn three_four() -> Self {
        Self::new(3, 4)
    }

    /// Common 6/8 time signature
    pub fn six_eight() -> Self {
        Self::new(6, 8)
    }

    /// Ticks in one beat of this signature
    pub fn ticks_per_beat(&self) -> u64 {
        BarTime::TICKS_PER_QUARTER * 4 / self.denominator as u64
    }

    /// Ticks in one full bar
    pub fn ticks_per_bar(&self) -> u64 {
        self.ticks_per_beat() * self.numerator as u64
    }

    /// Length of a bar in quarter notes
    /// Example: 4/4 = 4.0, 6/8 = 3.0
    pub fn quarters_per_bar(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (quarter notes per minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(Self::is_valid_bpm(bpm), "BPM must be between 20 and 999");
        Self { bpm }
    }

    pub fn is_valid_bpm(bpm: f64) -> bool {
        (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm)
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one quarter note in seconds
    pub fn quarter_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one bar in seconds at given time signature
    pub fn bar_duration_seconds(&self, time_signature: &TimeSignature) -> f64 {
        self.quarter_duration_seconds() * time_signature.quarters_per_bar()
    }

    /// Number of ticks elapsed in `seconds` of wall-clock time
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        let quarters = seconds / self.quarter_duration_seconds();
        (quarters * BarTime::TICKS_PER_QUARTER as f64) as u64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Error returned when a `"bar:beat:sixteenth"` string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bar time '{0}', expected \"<bar>:<beat>:<sixteenth>\"")]
pub struct ParseBarTimeError(pub String);

/// Position on the transport as bars:beats:sixteenths
///
/// All three fields are 0-based, so the first downbeat is `0:0:0`.
/// The scheduling core only ever produces bar boundaries (`"<bar>:0:0"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BarTime {
    pub bar: u32,
    pub beat: u8,
    pub sixteenth: u8,
}

impl BarTime {
    /// Pulses per quarter note
    pub const TICKS_PER_QUARTER: u64 = 192;

    /// Ticks in one sixteenth note, independent of the time signature
    pub const TICKS_PER_SIXTEENTH: u64 = Self::TICKS_PER_QUARTER / 4;

    pub fn new(bar: u32, beat: u8, sixteenth: u8) -> Self {
        Self {
            bar,
            beat,
            sixteenth,
        }
    }

    /// The downbeat of `bar`
    pub fn at_bar(bar: u32) -> Self {
        Self::new(bar, 0, 0)
    }

    pub fn is_bar_boundary(&self) -> bool {
        self.beat == 0 && self.sixteenth == 0
    }

    /// Convert to total ticks from `0:0:0`
    pub fn to_ticks(&self, time_signature: &TimeSignature) -> u64 {
        self.bar as u64 * time_signature.ticks_per_bar()
            + self.beat as u64 * time_signature.ticks_per_beat()
            + self.sixteenth as u64 * Self::TICKS_PER_SIXTEENTH
    }

    /// Create from total ticks, truncating anything below a sixteenth
    pub fn from_ticks(total_ticks: u64, time_signature: &TimeSignature) -> Self {
        let ticks_per_bar = time_signature.ticks_per_bar();
        let ticks_per_beat = time_signature.ticks_per_beat();

        let bar = total_ticks / ticks_per_bar;
        let in_bar = total_ticks % ticks_per_bar;
        let beat = in_bar / ticks_per_beat;
        let sixteenth = (in_bar % ticks_per_beat) / Self::TICKS_PER_SIXTEENTH;

        Self::new(bar as u32, beat as u8, sixteenth as u8)
    }
}

impl fmt::Display for BarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.bar, self.beat, self.sixteenth)
    }
}

impl FromStr for BarTime {
    type Err = ParseBarTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseBarTimeError(s.to_string());
        let mut parts = s.trim().split(':');

        let bar = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let beat = match parts.next() {
            Some(p) => p.parse().map_err(|_| err())?,
            None => 0,
        };
        let sixteenth = match parts.next() {
            Some(p) => p.parse().map_err(|_| err())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(err());
        }

        Ok(Self::new(bar, beat, sixteenth))
    }
}
