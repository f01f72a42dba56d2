//! Structural events over a MusicXML document
//!
//! [`EventReader`] walks the document with quick-xml and yields a flat stream
//! of [`ScoreEvent`]s. Only the element names the converter understands get
//! their own [`Tag`]; everything else is reported as [`Tag::Other`] so the
//! converter still sees where unknown elements open and close.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ConvertError, Result};

/// Element names of the supported MusicXML vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Part,
    Note,
    Pitch,
    Step,
    Octave,
    Alter,
    Rest,
    Chord,
    Duration,
    Voice,
    Tie,
    Staccato,
    Backup,
    Forward,
    Divisions,
    Beats,
    BeatType,
    Harmony,
    RootStep,
    RootAlter,
    Kind,
    Other,
}

impl Tag {
    pub fn from_name(name: &[u8]) -> Tag {
        match name {
            b"part" => Tag::Part,
            b"note" => Tag::Note,
            b"pitch" => Tag::Pitch,
            b"step" => Tag::Step,
            b"octave" => Tag::Octave,
            b"alter" => Tag::Alter,
            b"rest" => Tag::Rest,
            b"chord" => Tag::Chord,
            b"duration" => Tag::Duration,
            b"voice" => Tag::Voice,
            b"tie" => Tag::Tie,
            b"staccato" => Tag::Staccato,
            b"backup" => Tag::Backup,
            b"forward" => Tag::Forward,
            b"divisions" => Tag::Divisions,
            b"beats" => Tag::Beats,
            b"beat-type" => Tag::BeatType,
            b"harmony" => Tag::Harmony,
            b"root-step" => Tag::RootStep,
            b"root-alter" => Tag::RootAlter,
            b"kind" => Tag::Kind,
            _ => Tag::Other,
        }
    }

    /// Element name as written in the document (`"other"` for unknown ones)
    pub fn name(self) -> &'static str {
        match self {
            Tag::Part => "part",
            Tag::Note => "note",
            Tag::Pitch => "pitch",
            Tag::Step => "step",
            Tag::Octave => "octave",
            Tag::Alter => "alter",
            Tag::Rest => "rest",
            Tag::Chord => "chord",
            Tag::Duration => "duration",
            Tag::Voice => "voice",
            Tag::Tie => "tie",
            Tag::Staccato => "staccato",
            Tag::Backup => "backup",
            Tag::Forward => "forward",
            Tag::Divisions => "divisions",
            Tag::Beats => "beats",
            Tag::BeatType => "beat-type",
            Tag::Harmony => "harmony",
            Tag::RootStep => "root-step",
            Tag::RootAlter => "root-alter",
            Tag::Kind => "kind",
            Tag::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreEvent {
    Start {
        tag: Tag,
        attributes: Vec<(String, String)>,
    },
    End(Tag),
    Text(String),
}

impl ScoreEvent {
    /// Start event without attributes
    pub fn start(tag: Tag) -> ScoreEvent {
        ScoreEvent::Start {
            tag,
            attributes: Vec::new(),
        }
    }

    pub fn start_with(tag: Tag, key: &str, value: &str) -> ScoreEvent {
        ScoreEvent::Start {
            tag,
            attributes: vec![(key.to_string(), value.to_string())],
        }
    }

    pub fn text(content: &str) -> ScoreEvent {
        ScoreEvent::Text(content.to_string())
    }

    /// Value of an attribute on a start event
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            ScoreEvent::Start { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Streaming reader yielding [`ScoreEvent`]s.
///
/// Self-closing elements such as `<chord/>` produce a `Start` followed by an
/// `End`. Whitespace-only text is skipped.
pub struct EventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending_end: Option<Tag>,
    done: bool,
}

impl<'a> EventReader<&'a [u8]> {
    pub fn from_text(xml: &'a str) -> Self {
        EventReader::new(xml.as_bytes())
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        EventReader {
            reader,
            buf: Vec::new(),
            pending_end: None,
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<Option<ScoreEvent>> {
        if let Some(tag) = self.pending_end.take() {
            return Ok(Some(ScoreEvent::End(tag)));
        }
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf).map_err(|e| {
                ConvertError::Xml(format!("at position {}: {}", self.reader.buffer_position(), e))
            })?;
            match event {
                Event::Start(ref e) => return start_event(e).map(Some),
                Event::Empty(ref e) => {
                    let start = start_event(e)?;
                    if let ScoreEvent::Start { tag, .. } = &start {
                        self.pending_end = Some(*tag);
                    }
                    return Ok(Some(start));
                }
                Event::End(ref e) => {
                    return Ok(Some(ScoreEvent::End(Tag::from_name(e.name().as_ref()))));
                }
                Event::Text(ref e) => {
                    let text = e.unescape()?;
                    if !text.trim().is_empty() {
                        return Ok(Some(ScoreEvent::Text(text.into_owned())));
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    if !text.trim().is_empty() {
                        return Ok(Some(ScoreEvent::Text(text)));
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

fn start_event(e: &BytesStart) -> Result<ScoreEvent> {
    let tag = Tag::from_name(e.name().as_ref());
    let mut attributes = Vec::new();
    // Attribute values of unknown elements are never consulted
    if tag != Tag::Other {
        for attr in e.attributes() {
            let attr = attr.map_err(|e| ConvertError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
    }
    Ok(ScoreEvent::Start { tag, attributes })
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<ScoreEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
