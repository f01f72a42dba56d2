//! Converter output types
//!
//! This module defines the note events produced by the converter and the
//! hand-off seam to whatever renders them.

use serde::Serialize;

use crate::error::Result;

/// One sounding note: start and end in seconds, MIDI pitch number.
///
/// The pitch is not range checked; see [`crate::midi`] for where that
/// happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    pub start: f64,
    pub end: f64,
    pub pitch: i32,
}

impl NoteEvent {
    pub fn new(start: f64, end: f64, pitch: i32) -> Self {
        NoteEvent { start, end, pitch }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Copy of this event moved `offset` seconds earlier
    pub fn shifted(&self, offset: f64) -> Self {
        NoteEvent {
            start: self.start - offset,
            end: self.end - offset,
            pitch: self.pitch,
        }
    }
}

/// Melody and harmony tracks handed off at the end of a `<part>`.
///
/// # Fields
/// - `part_id`: the part's `id` attribute, when present
/// - `melody`: notes of this part only
/// - `harmony`: expanded chord symbols; accumulates over earlier parts unless
///   `reset-harmony-per-part` is set
/// - `total_length`: whole-score length hint in quarter notes
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracks {
    pub part_id: Option<String>,
    pub melody: Vec<NoteEvent>,
    pub harmony: Vec<NoteEvent>,
    pub total_length: u64,
}

impl Tracks {
    /// Earliest start time across both tracks
    pub fn first_start(&self) -> Option<f64> {
        self.melody
            .iter()
            .chain(self.harmony.iter())
            .map(|n| n.start)
            .reduce(f64::min)
    }

    pub fn all_notes(&self) -> impl Iterator<Item = &NoteEvent> {
        self.melody.iter().chain(self.harmony.iter())
    }

    pub fn all_notes_mut(&mut self) -> impl Iterator<Item = &mut NoteEvent> {
        self.melody.iter_mut().chain(self.harmony.iter_mut())
    }
}

/// Receiver of finished tracks, called once per `<part>`.
pub trait TrackSink {
    fn accept(&mut self, tracks: Tracks) -> Result<()>;
}

impl TrackSink for Vec<Tracks> {
    fn accept(&mut self, tracks: Tracks) -> Result<()> {
        self.push(tracks);
        Ok(())
    }
}

/// Keeps only the most recent hand-off.
///
/// A multi-part document renders to one file, which ends up holding the last
/// part's melody together with the harmony gathered so far.
#[derive(Debug, Default)]
pub struct LastTracks(pub Option<Tracks>);

impl TrackSink for LastTracks {
    fn accept(&mut self, tracks: Tracks) -> Result<()> {
        self.0 = Some(tracks);
        Ok(())
    }
}
