//! # Error Types
//!
//! This module defines every way converting a MusicXML document can fail.
//!
//! All failures are terminal for the document being converted: nothing is
//! retried and no partial MIDI output is written. Callers converting many
//! files (see [`crate::batch`]) classify the error and move on.
//!
//! ## Structural errors
//! - `MissingDuration`, `MissingDurationForBackup`, `MissingDurationForForward`
//! - `MissingPitch`
//! - `ChordBeforeDuration`
//! - `DivisionsNotSet`
//!
//! ## Harmony errors
//! - `UnknownChordQuality` - carries the quality name for statistics
//! - `NoHarmonyDetected`
//!
//! ## Usage
//! ```rust
//! use scoremidi::{convert_str, ConvertError, ConvertOptions};
//!
//! match convert_str("<score-partwise/>", &ConvertOptions::default()) {
//!     Ok(parts) => println!("converted {} part(s)", parts.len()),
//!     Err(ConvertError::UnknownChordQuality(kind)) => eprintln!("unsupported chord: {}", kind),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// A `<note>` closed before its `<duration>` was read.
    #[error("XML misformed, a Duration tag is missing")]
    MissingDuration,

    #[error("XML Duration not set for a backup")]
    MissingDurationForBackup,

    #[error("XML Duration not set for a forward")]
    MissingDurationForForward,

    /// A printed note that is not a rest has no complete `<pitch>`.
    #[error("XML misformed, a Pitch tag is missing")]
    MissingPitch,

    #[error("A chord tag should be placed before the duration tag of the current note")]
    ChordBeforeDuration,

    /// Chord symbol quality absent from the quality table.
    ///
    /// # Example
    /// ```
    /// # use scoremidi::ConvertError;
    /// let err = ConvertError::UnknownChordQuality("pedal".to_string());
    /// assert_eq!(err.to_string(), "Chord type not present in dictionary: pedal");
    /// assert_eq!(err.unsupported_quality(), Some("pedal"));
    /// ```
    #[error("Chord type not present in dictionary: {0}")]
    UnknownChordQuality(String),

    #[error("No harmony was detected in this file")]
    NoHarmonyDetected,

    /// A time value was needed before `<divisions>` was read in the part.
    #[error("divisions not defined before the first timed element")]
    DivisionsNotSet,

    /// Numeric element content that could not be parsed.
    ///
    /// # Example
    /// ```
    /// # use scoremidi::ConvertError;
    /// let err = ConvertError::InvalidNumber {
    ///     element: "duration".to_string(),
    ///     value: "four".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid number in <duration>: four");
    /// ```
    #[error("Invalid number in <{element}>: {value}")]
    InvalidNumber { element: String, value: String },

    #[error("Invalid step letter: {0}")]
    InvalidStep(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    /// Unreadable `.mxl` archive, or one without a score inside.
    #[error("MXL archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid chord table: {0}")]
    ChordTable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Raised when writing MIDI; the converter itself never clamps pitches.
    #[error("Pitch {0} is outside the MIDI range 0..=127")]
    PitchOutOfRange(i32),

    #[error("MIDI write error: {0}")]
    Midi(String),
}

impl ConvertError {
    /// The chord quality name when this is an `UnknownChordQuality` failure.
    pub fn unsupported_quality(&self) -> Option<&str> {
        match self {
            ConvertError::UnknownChordQuality(kind) => Some(kind),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ConvertError {
    fn from(e: quick_xml::Error) -> Self {
        ConvertError::Xml(e.to_string())
    }
}

impl From<zip::result::ZipError> for ConvertError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(e) => ConvertError::Io(e),
            other => ConvertError::Archive(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
