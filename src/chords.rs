//! Chord-quality table
//!
//! Maps a MusicXML `<kind>` value (e.g. `major`, `minor-seventh`) to the
//! semitone offsets of its chord tones relative to the root. Lookups are exact
//! and case-sensitive; there is no fallback quality.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{ConvertError, Result};

const BUILTIN_YAML: &str = include_str!("chords.yaml");

static BUILTIN: OnceLock<std::result::Result<ChordTable, String>> = OnceLock::new();

/// Immutable quality name -> offsets mapping, injected into the converter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordTable {
    qualities: HashMap<String, Vec<i32>>,
}

impl ChordTable {
    /// The table shipped with the crate, parsed on first use.
    pub fn builtin() -> Result<&'static ChordTable> {
        BUILTIN
            .get_or_init(|| ChordTable::from_yaml_str(BUILTIN_YAML).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| ConvertError::ChordTable(e.clone()))
    }

    /// Parse a table written as a YAML mapping of `name: [offsets...]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let qualities: HashMap<String, Vec<i32>> =
            serde_yaml::from_str(yaml).map_err(|e| ConvertError::ChordTable(e.to_string()))?;
        for (name, offsets) in &qualities {
            if offsets.is_empty() {
                return Err(ConvertError::ChordTable(format!("quality '{}' has no chord tones", name)));
            }
        }
        Ok(ChordTable { qualities })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Offsets for `quality`, in table order.
    pub fn lookup(&self, quality: &str) -> Result<&[i32]> {
        self.qualities
            .get(quality)
            .map(Vec::as_slice)
            .ok_or_else(|| ConvertError::UnknownChordQuality(quality.to_string()))
    }

    pub fn contains(&self, quality: &str) -> bool {
        self.qualities.contains_key(quality)
    }

    pub fn len(&self) -> usize {
        self.qualities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualities.is_empty()
    }
}
