//! # Convert Module
//!
//! Turn a stream of MusicXML structural events into timed note events, split
//! into a melody track and a harmony (chord symbol) track.
//!
//! ## Sub-modules
//! - `types` - NoteEvent, Tracks and the TrackSink hand-off
//! - `state` - the converter's state record
//! - `engine` - the transition function over structural events
//!
//! ## Timing
//! The cursor counts divisions (the document's subdivision of a quarter
//! note) and is scoped to the current part. Times are converted to seconds at
//! a fixed tempo:
//!
//! `seconds = (60 / bpm) * divisions_elapsed / divisions_per_quarter`
//!
//! Tempo markings in the document are not read.
//!
//! ## Harmony
//! A chord symbol sounds from the point it appears until the next chord
//! symbol, or the end of the part. Each span expands to one note per chord
//! tone, voiced in the octave of the last note read.
//!
//! ## Example
//! ```rust
//! use scoremidi::{convert_str, ConvertOptions};
//!
//! let xml = r#"<score-partwise><part id="P1"><measure>
//!   <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
//!   <harmony><root><root-step>C</root-step></root><kind>major</kind></harmony>
//!   <note><pitch><step>C</step><octave>5</octave></pitch><duration>1</duration></note>
//! </measure></part></score-partwise>"#;
//!
//! let parts = convert_str(xml, &ConvertOptions::default()).unwrap();
//! assert_eq!(parts[0].melody[0].pitch, 60);
//! assert_eq!(parts[0].harmony.len(), 3);
//! ```

mod engine;
mod state;
mod types;


pub use engine::ScoreParser;
pub use state::TieKind;
pub use types::{LastTracks, NoteEvent, TrackSink, Tracks};
