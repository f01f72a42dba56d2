//! Total-length pre-pass
//!
//! A first scan over the document that measures how long the score is
//! before the converter runs.

use super::events::{ScoreEvent, Tag};
use crate::error::{ConvertError, Result};

/// Total notated length of a score in quarter notes, rounded up.
///
/// Walks the event stream once, moving a cursor the way the converter does
/// (notes advance it unless hidden, `<chord/>` rewinds to the previous onset,
/// `<backup>` and `<forward>` jump) and reports the furthest point reached by
/// any part. Durations read before `<divisions>` are skipped.
pub fn total_length<I>(events: I) -> Result<u64>
where
    I: IntoIterator<Item = Result<ScoreEvent>>,
{
    let mut context = None;
    let mut divisions: Option<f64> = None;
    let mut duration = 0.0;
    let mut duration_read = false;
    let mut hidden = false;
    let mut cursor = 0.0_f64;
    let mut furthest = 0.0_f64;

    for event in events {
        match event? {
            ScoreEvent::Start { tag, attributes } => {
                match tag {
                    Tag::Part => {
                        cursor = 0.0;
                        divisions = None;
                    }
                    Tag::Note => {
                        hidden = attributes
                            .iter()
                            .any(|(k, v)| k == "print-object" && v == "no");
                    }
                    Tag::Chord if !duration_read => cursor -= duration,
                    _ => {}
                }
                context = Some(tag);
            }
            ScoreEvent::Text(text) => match context {
                Some(Tag::Divisions) => {
                    let value: f64 = parse_number(Tag::Divisions, &text)?;
                    divisions = (value > 0.0).then_some(value);
                }
                Some(Tag::Duration) => {
                    let value: f64 = parse_number(Tag::Duration, &text)?;
                    match divisions {
                        Some(div) => {
                            duration = value / div;
                            duration_read = true;
                        }
                        None => log::warn!("duration {} read before divisions; ignored", value),
                    }
                }
                _ => {}
            },
            ScoreEvent::End(tag) => {
                match tag {
                    Tag::Note => {
                        if duration_read && !hidden {
                            cursor += duration;
                        }
                        duration_read = false;
                        hidden = false;
                    }
                    Tag::Backup if duration_read => {
                        cursor -= duration;
                        duration_read = false;
                    }
                    Tag::Forward if duration_read => {
                        cursor += duration;
                        duration_read = false;
                    }
                    _ => {}
                }
                furthest = furthest.max(cursor);
                context = None;
            }
        }
    }

    Ok(furthest.ceil() as u64)
}

fn parse_number(tag: Tag, text: &str) -> Result<f64> {
    text.trim().parse().map_err(|_| ConvertError::InvalidNumber {
        element: tag.name().to_string(),
        value: text.trim().to_string(),
    })
}
