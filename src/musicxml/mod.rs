//! # MusicXML Input
//!
//! Everything that touches the raw document before the converter sees it.
//!
//! ## Sub-modules
//! - `events` - quick-xml backed stream of [`ScoreEvent`]s
//! - `sanitize` - DOCTYPE removal and the temporary sanitized copy
//! - `length` - total-length pre-pass in quarter notes
//! - `archive` - extraction of compressed `.mxl` files
//!
//! Only `score-partwise` documents using the element vocabulary listed on
//! [`Tag`] are understood.

mod archive;
mod events;
mod length;
mod sanitize;

pub use archive::{is_archive, read_document};
pub use events::{EventReader, ScoreEvent, Tag};
pub use length::total_length;
pub use sanitize::{sanitize_doctype, sanitized_copy};
