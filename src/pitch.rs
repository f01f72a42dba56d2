//! Step letters and the MIDI pitch formula
//!
//! `pitch = semitone(step) + 12 * octave + alter`, with C at octave 0 being
//! pitch 0. There is no clamping to the MIDI range here.

use std::str::FromStr;

use crate::error::ConvertError;

/// Diatonic step letter as written in `<step>` and `<root-step>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Semitone offset from C
    pub fn semitone(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }
}

impl FromStr for Step {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" => Ok(Step::C),
            "D" => Ok(Step::D),
            "E" => Ok(Step::E),
            "F" => Ok(Step::F),
            "G" => Ok(Step::G),
            "A" => Ok(Step::A),
            "B" => Ok(Step::B),
            other => Err(ConvertError::InvalidStep(other.to_string())),
        }
    }
}

/// MIDI pitch number for a step, octave and alteration.
///
/// No range check is made: octave 10 or a large alteration yields values
/// above 127 and negative octaves yield negative values. `None` only when
/// the result does not fit in an `i32`.
///
/// ```
/// use scoremidi::pitch::{midi_pitch, Step};
///
/// assert_eq!(midi_pitch(Step::C, 5, 0), Some(60));
/// assert_eq!(midi_pitch(Step::B, 4, -1), Some(58));
/// assert_eq!(midi_pitch(Step::C, 300_000_000, 0), None);
/// ```
pub fn midi_pitch(step: Step, octave: i32, alter: i32) -> Option<i32> {
    octave
        .checked_mul(12)?
        .checked_add(step.semitone())?
        .checked_add(alter)
}
