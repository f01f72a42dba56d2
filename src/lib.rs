pub mod batch;
pub mod chords;
pub mod config;
pub mod convert;
pub mod error;
pub mod midi;
pub mod musicxml;
pub mod pitch;
pub mod transpose;

use std::io::BufReader;
use std::path::Path;

pub use chords::ChordTable;
pub use config::ConvertOptions;
pub use convert::{LastTracks, NoteEvent, ScoreParser, TrackSink, Tracks};
pub use error::*;

use musicxml::{sanitize_doctype, sanitized_copy, total_length, EventReader};

/// Convert a MusicXML document held in memory.
///
/// Returns the tracks handed off at the end of every `<part>`, in document
/// order. A document without any part yields an empty list.
pub fn convert_str(xml: &str, options: &ConvertOptions) -> Result<Vec<Tracks>> {
    options.validate()?;
    let table = options.load_chord_table()?;
    let xml = sanitize_doctype(xml);

    let length = total_length(EventReader::from_text(&xml))?;
    let mut parts = Vec::new();
    ScoreParser::new(&table, options, length).run(EventReader::from_text(&xml), &mut parts)?;

    if options.transpose {
        for tracks in &mut parts {
            transpose::to_reference(tracks);
        }
    }
    Ok(parts)
}

/// Convert a MusicXML (`.xml`, `.musicxml`) or compressed (`.mxl`) file to
/// the tracks that would be written as MIDI.
pub fn convert_file_to_tracks(input: impl AsRef<Path>, options: &ConvertOptions) -> Result<Tracks> {
    options.validate()?;
    let table = options.load_chord_table()?;
    convert_file_to_tracks_with_table(input, options, &table)
}

/// Like [`convert_file_to_tracks`], with an already loaded chord table.
///
/// The document is sanitized into a temporary copy which both passes read;
/// the copy is removed whether or not conversion succeeds. The
/// `chord_table` path of `options` is ignored.
pub fn convert_file_to_tracks_with_table(
    input: impl AsRef<Path>,
    options: &ConvertOptions,
    table: &ChordTable,
) -> Result<Tracks> {
    options.validate()?;
    let copy = sanitized_copy(input.as_ref(), options.temp_dir.as_deref())?;

    let length = total_length(EventReader::new(BufReader::new(copy.reopen()?)))?;
    log::trace!("total length: {} quarter notes", length);

    let mut last = LastTracks::default();
    let events = EventReader::new(BufReader::new(copy.reopen()?));
    ScoreParser::new(table, options, length).run(events, &mut last)?;
    let mut tracks = last.0.ok_or(ConvertError::NoHarmonyDetected)?;

    if options.transpose && transpose::to_reference(&mut tracks).is_none() {
        log::warn!("no notes to estimate a key from; not transposed");
    }
    Ok(tracks)
}

/// Convert a file and write the two-track MIDI file.
///
/// Nothing is written unless the whole document converts.
pub fn convert_file(input: impl AsRef<Path>, output: impl AsRef<Path>, options: &ConvertOptions) -> Result<Tracks> {
    options.validate()?;
    let table = options.load_chord_table()?;
    convert_file_with_table(input, output, options, &table)
}

/// Like [`convert_file`], with an already loaded chord table. Used when
/// converting many files with one table.
pub fn convert_file_with_table(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConvertOptions,
    table: &ChordTable,
) -> Result<Tracks> {
    log::debug!("[START] Currently working on: {}", input.as_ref().display());
    let tracks = convert_file_to_tracks_with_table(input, options, table)?;
    midi::save_smf(&tracks, options, output)?;
    Ok(tracks)
}
