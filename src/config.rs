//! Conversion options
//!
//! Options can be written as a YAML file using kebab-case keys; any key left
//! out keeps its default.
//!
//! ```yaml
//! bpm: 120
//! remove-silence: true
//! velocity: 127
//! chord-table: my-chords.yaml
//! temp-dir: /var/tmp/scoremidi
//! ```

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chords::ChordTable;
use crate::error::{ConvertError, Result};

/// Tempo used for every conversion unless overridden. Tempo markings in the
/// document are never read.
pub const DEFAULT_BPM: f64 = 120.0;

/// Largest value a MIDI set-tempo event can hold (24 bits)
const MAX_TEMPO_MICROSECONDS: f64 = 16_777_215.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConvertOptions {
    pub bpm: f64,
    /// Shift both tracks so the earliest event starts at zero
    pub remove_silence: bool,
    /// Clear the harmony list at every `<part>`, like the melody list
    pub reset_harmony_per_part: bool,
    pub velocity: u8,
    /// General MIDI program for both tracks
    pub program: u8,
    pub ticks_per_quarter: u16,
    /// Transpose output to C major / A minor
    pub transpose: bool,
    /// Replaces the built-in chord-quality table
    pub chord_table: Option<PathBuf>,
    /// Where sanitized copies are written; the system temporary directory
    /// when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            bpm: DEFAULT_BPM,
            remove_silence: true,
            reset_harmony_per_part: false,
            velocity: 127,
            program: 0,
            ticks_per_quarter: 480,
            transpose: false,
            chord_table: None,
            temp_dir: None,
        }
    }
}

impl ConvertOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: ConvertOptions =
            serde_yaml::from_str(yaml).map_err(|e| ConvertError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(ConvertError::Config(format!("bpm must be positive, got {}", self.bpm)));
        }
        let tempo = self.tempo_microseconds();
        if !(1.0..=MAX_TEMPO_MICROSECONDS).contains(&tempo) {
            return Err(ConvertError::Config(format!(
                "bpm {} cannot be written as a MIDI tempo (about 3.58 to 60000000)",
                self.bpm
            )));
        }
        if self.velocity > 127 {
            return Err(ConvertError::Config(format!("velocity must be 0-127, got {}", self.velocity)));
        }
        if self.program > 127 {
            return Err(ConvertError::Config(format!("program must be 0-127, got {}", self.program)));
        }
        if self.ticks_per_quarter == 0 || self.ticks_per_quarter > 0x7fff {
            return Err(ConvertError::Config(format!(
                "ticks-per-quarter must be 1-32767, got {}",
                self.ticks_per_quarter
            )));
        }
        Ok(())
    }

    /// Seconds per quarter note at the configured tempo
    pub fn seconds_per_quarter(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Microseconds per quarter note, as stored in a MIDI tempo event.
    /// Only in range once [`validate`](Self::validate) has passed.
    pub fn microseconds_per_quarter(&self) -> u32 {
        self.tempo_microseconds() as u32
    }

    fn tempo_microseconds(&self) -> f64 {
        (60_000_000.0 / self.bpm).round()
    }

    /// The chord table these options select: the configured file, or the
    /// shared built-in table.
    ///
    /// Reads the file on every call; load once and pass the table to each
    /// conversion when converting many documents.
    pub fn load_chord_table(&self) -> Result<Cow<'static, ChordTable>> {
        match &self.chord_table {
            Some(path) => ChordTable::from_file(path).map(Cow::Owned),
            None => ChordTable::builtin().map(Cow::Borrowed),
        }
    }
}
