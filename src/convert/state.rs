//! Converter state record
//!
//! Every field the converter mutates lives here, grouped by when it resets:
//! per part, per note, or never.

use std::collections::HashMap;

use crate::error::{ConvertError, Result};
use crate::musicxml::Tag;
use crate::pitch::Step;

use super::types::NoteEvent;

/// Direction of a `<tie type="...">` marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieKind {
    Start,
    Stop,
}

impl TieKind {
    pub fn from_attribute(value: &str) -> Option<TieKind> {
        match value {
            "start" => Some(TieKind::Start),
            "stop" => Some(TieKind::Stop),
            _ => None,
        }
    }
}

/// Time cursor and meter. Cursor and divisions reset at `<part>`; the meter
/// carries over until the next `<time>` is read.
#[derive(Debug, Clone, Default)]
pub struct Timing {
    /// In divisions; may go negative on a malformed `<backup>`
    pub cursor: i64,
    pub divisions: Option<i64>,
    pub beats: Option<i64>,
    pub beat_type: Option<i64>,
    /// In divisions
    pub bar_length: Option<i64>,
}

impl Timing {
    pub fn update_bar_length(&mut self) -> Result<()> {
        if let (Some(div), Some(beats), Some(beat_type)) = (self.divisions, self.beats, self.beat_type) {
            if beat_type > 0 {
                let bar = div
                    .checked_mul(beats)
                    .and_then(|n| n.checked_mul(4))
                    .ok_or_else(|| ConvertError::InvalidNumber {
                        element: "time".to_string(),
                        value: format!("{}/{} at {} divisions", beats, beat_type, div),
                    })?;
                self.bar_length = Some(bar / beat_type);
            }
        }
        Ok(())
    }

    /// Move the cursor forward by `delta` divisions
    pub fn advance(&mut self, delta: i64) -> Result<()> {
        self.cursor = self.cursor.checked_add(delta).ok_or_else(|| cursor_overflow(delta))?;
        Ok(())
    }

    /// Move the cursor back by `delta` divisions
    pub fn rewind(&mut self, delta: i64) -> Result<()> {
        self.cursor = self.cursor.checked_sub(delta).ok_or_else(|| cursor_overflow(delta))?;
        Ok(())
    }
}

fn cursor_overflow(delta: i64) -> ConvertError {
    ConvertError::InvalidNumber {
        element: "duration".to_string(),
        value: delta.to_string(),
    }
}

/// Last values read, kept after the note they belong to closes.
///
/// A `<chord/>` rewinds by the previous `duration`, and a chord span is
/// voiced in the last `octave` seen.
#[derive(Debug, Clone, Default)]
pub struct Carried {
    pub duration: i64,
    pub step: Option<Step>,
    pub octave: i32,
    pub previous_staccato: bool,
}

/// Flags of the note being read, cleared when `</note>` is processed.
#[derive(Debug, Clone, Default)]
pub struct PendingNote {
    /// `print-object="no"`: neither sounds nor advances time
    pub suppressed: bool,
    pub rest: bool,
    pub chord: bool,
    pub step_read: bool,
    pub octave_read: bool,
    pub pitch_read: bool,
    pub duration_read: bool,
    pub alter: i32,
    pub voice: Option<String>,
    pub tie: Option<TieKind>,
    pub staccato: bool,
}

/// Chord symbol fields being read inside `<harmony>`
#[derive(Debug, Clone, Default)]
pub struct PendingHarmony {
    pub root: Option<Step>,
    pub alter: i32,
    pub kind: Option<String>,
}

/// The chord symbol currently sounding, waiting for its end time
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSpan {
    pub root: Step,
    pub alter: i32,
    pub kind: String,
    pub start: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ParserState {
    /// Element whose text is currently being read
    pub context: Option<Tag>,
    pub part_id: Option<String>,
    pub timing: Timing,
    pub carried: Carried,
    pub note: PendingNote,
    pub pending_harmony: PendingHarmony,
    pub open_span: Option<OpenSpan>,
    /// voice -> tie open
    pub ties: HashMap<String, bool>,
    pub melody: Vec<NoteEvent>,
    pub harmony: Vec<NoteEvent>,
}

impl ParserState {
    /// Reset for a new `<part>`. The harmony list is kept unless asked.
    pub fn begin_part(&mut self, part_id: Option<String>, reset_harmony: bool) {
        self.part_id = part_id;
        self.timing.cursor = 0;
        self.timing.divisions = None;
        self.melody.clear();
        if reset_harmony {
            self.harmony.clear();
        }
    }

    /// Clear everything that belongs to the note just closed
    pub fn end_note(&mut self) {
        self.carried.previous_staccato = self.note.staccato;
        self.note = PendingNote::default();
        self.pending_harmony = PendingHarmony::default();
    }
}
