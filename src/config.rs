// Engine configuration - RON file with defaults for every field
// Describes how a session starts; the timeline state itself is never saved

use crate::command::manager::{CommandManager, DEFAULT_MAX_HISTORY};
use crate::sequencer::clock::Clock;
use crate::sequencer::note::{NoteValue, Pitch, TriggerPayload};
use crate::sequencer::time::{Tempo, TimeSignature};
use crate::sequencer::timeline::{Timeline, TimelineError};
use crate::sequencer::transport::Transport;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Loop length in bars
    pub length: usize,
    /// One empty track per name, in order
    pub tracks: Vec<String>,
    pub tempo_bpm: f64,
    pub time_signature: TimeSignature,
    /// Live registration limit of the transport, unlimited when absent
    pub registration_capacity: Option<usize>,
    /// Undo history depth
    pub history_size: usize,
    pub default_pitch: Pitch,
    pub default_duration: NoteValue,
    pub default_velocity: u8,
    /// Slots in the change notification ring
    pub notification_capacity: usize,
    pub sequencer_loop: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            length: 8,
            tracks: Vec::new(),
            tempo_bpm: 120.0,
            time_signature: TimeSignature::default(),
            registration_capacity: None,
            history_size: DEFAULT_MAX_HISTORY,
            default_pitch: Pitch::C4,
            default_duration: NoteValue::Eighth,
            default_velocity: 100,
            notification_capacity: 256,
            sequencer_loop: false,
        }
    }
}

impl TimelineConfig {
    /// Parse and validate a RON document
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&source)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.length == 0 || self.length > Timeline::<Transport>::MAX_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "length must be between 1 and {}, got {}",
                Timeline::<Transport>::MAX_LENGTH,
                self.length
            )));
        }
        if !Tempo::is_valid_bpm(self.tempo_bpm) {
            return Err(ConfigError::Invalid(format!(
                "tempo must be between {} and {} BPM, got {}",
                Tempo::MIN_BPM,
                Tempo::MAX_BPM,
                self.tempo_bpm
            )));
        }
        if self.default_velocity > 127 {
            return Err(ConfigError::Invalid(format!(
                "velocity must be at most 127, got {}",
                self.default_velocity
            )));
        }
        if self.history_size == 0 {
            return Err(ConfigError::Invalid("history size must be at least 1".into()));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notification capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn default_payload(&self) -> TriggerPayload {
        TriggerPayload::new(self.default_pitch, self.default_duration, self.default_velocity)
    }

    /// Stopped transport with the configured timing and capacity
    pub fn build_transport(&self) -> Result<Transport, ConfigError> {
        self.validate()?;
        let mut transport = Transport::with_timing(Tempo::new(self.tempo_bpm), self.time_signature);
        transport.set_capacity(self.registration_capacity);
        Ok(transport)
    }

    /// Timeline over `clock` with the configured tracks and modes
    pub fn build_timeline<C: Clock>(&self, clock: C) -> Result<Timeline<C>, ConfigError> {
        self.validate()?;
        let mut timeline = Timeline::new(clock, self.length)?;
        timeline.set_default_payload(self.default_payload());
        for name in &self.tracks {
            timeline.add_sequencer(name.clone())?;
        }
        timeline.set_sequencer_loop(self.sequencer_loop)?;
        Ok(timeline)
    }

    pub fn build_command_manager<C: Clock>(&self) -> CommandManager<C> {
        CommandManager::with_capacity(self.history_size)
    }
}
