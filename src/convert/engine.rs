//! Converter engine
//!
//! A single transition function, [`ScoreParser::feed`], moves the
//! [`ParserState`] forward for each structural event. Notes become melody
//! events when they close; chord symbols become harmony events when the next
//! symbol (or the end of the part) closes them.

use std::collections::HashMap;

use crate::chords::ChordTable;
use crate::config::ConvertOptions;
use crate::error::{ConvertError, Result};
use crate::musicxml::{ScoreEvent, Tag};
use crate::pitch::{midi_pitch, Step};

use super::state::{OpenSpan, ParserState, TieKind};
use super::types::{NoteEvent, TrackSink, Tracks};

pub struct ScoreParser<'t> {
    table: &'t ChordTable,
    seconds_per_quarter: f64,
    remove_silence: bool,
    reset_harmony_per_part: bool,
    total_length: u64,
    state: ParserState,
}

impl<'t> ScoreParser<'t> {
    pub fn new(table: &'t ChordTable, options: &ConvertOptions, total_length: u64) -> Self {
        ScoreParser {
            table,
            seconds_per_quarter: options.seconds_per_quarter(),
            remove_silence: options.remove_silence,
            reset_harmony_per_part: options.reset_harmony_per_part,
            total_length,
            state: ParserState::default(),
        }
    }

    /// Feed every event of a document, stopping at the first failure.
    pub fn run<I, S>(&mut self, events: I, sink: &mut S) -> Result<()>
    where
        I: IntoIterator<Item = Result<ScoreEvent>>,
        S: TrackSink + ?Sized,
    {
        for event in events {
            self.feed(event?, sink)?;
        }
        Ok(())
    }

    /// Apply one structural event.
    pub fn feed<S: TrackSink + ?Sized>(&mut self, event: ScoreEvent, sink: &mut S) -> Result<()> {
        match event {
            ScoreEvent::Start { tag, attributes } => {
                let attribute = |key: &str| {
                    attributes
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.as_str())
                };
                self.start(tag, attribute("id"), attribute("print-object"), attribute("type"))
            }
            ScoreEvent::Text(text) => self.text(&text),
            ScoreEvent::End(tag) => self.end(tag, sink),
        }
    }

    /// Tie state per voice, `true` while a tie is open
    pub fn ties(&self) -> &HashMap<String, bool> {
        &self.state.ties
    }

    /// Staccato flag of the last note closed, after chord propagation
    pub fn last_staccato(&self) -> bool {
        self.state.carried.previous_staccato
    }

    /// Current cursor position in divisions
    pub fn cursor(&self) -> i64 {
        self.state.timing.cursor
    }

    fn start(
        &mut self,
        tag: Tag,
        id: Option<&str>,
        print_object: Option<&str>,
        tie_type: Option<&str>,
    ) -> Result<()> {
        let state = &mut self.state;
        state.context = Some(tag);
        match tag {
            Tag::Part => {
                log::debug!("[PART] start {}", id.unwrap_or("(no id)"));
                state.begin_part(id.map(str::to_string), self.reset_harmony_per_part);
            }
            Tag::Harmony => state.pending_harmony = Default::default(),
            Tag::Note => state.note.suppressed = print_object == Some("no"),
            Tag::Rest => state.note.rest = true,
            Tag::Chord => {
                if state.note.duration_read {
                    return Err(ConvertError::ChordBeforeDuration);
                }
                state.timing.rewind(state.carried.duration)?;
                state.note.chord = true;
            }
            Tag::Tie => {
                state.note.tie = tie_type.and_then(TieKind::from_attribute);
                if state.note.tie.is_none() {
                    log::debug!("ignoring tie with type {:?}", tie_type);
                }
            }
            Tag::Staccato => state.note.staccato = true,
            Tag::Pitch
            | Tag::Step
            | Tag::Octave
            | Tag::Alter
            | Tag::Duration
            | Tag::Voice
            | Tag::Backup
            | Tag::Forward
            | Tag::Divisions
            | Tag::Beats
            | Tag::BeatType
            | Tag::RootStep
            | Tag::RootAlter
            | Tag::Kind
            | Tag::Other => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let Some(context) = self.state.context else {
            return Ok(());
        };
        let value = text.trim();
        let state = &mut self.state;
        match context {
            Tag::Divisions => {
                let divisions = parse_int(context, value)?;
                if divisions <= 0 {
                    return Err(invalid_number(context, value));
                }
                state.timing.divisions = Some(divisions);
                state.timing.update_bar_length()?;
            }
            Tag::Beats => {
                state.timing.beats = Some(parse_beats(value)?);
            }
            Tag::BeatType => {
                state.timing.beat_type = Some(parse_int(context, value)?);
                state.timing.update_bar_length()?;
            }
            Tag::Duration => {
                let mut duration = parse_int(context, value)?;
                if state.note.rest {
                    match state.timing.bar_length {
                        // Whole-bar rests are often written as one long rest regardless of meter
                        Some(bar) if duration > bar => {
                            log::debug!("[REST] clamping duration {} to bar length {}", duration, bar);
                            duration = bar;
                        }
                        Some(_) => {}
                        None => log::warn!("rest read before the meter; duration left unclamped"),
                    }
                }
                state.carried.duration = duration;
                state.note.duration_read = true;
            }
            Tag::Step => {
                state.carried.step = Some(value.parse()?);
                state.note.step_read = true;
            }
            Tag::Octave => {
                state.carried.octave =
                    i32::try_from(parse_int(context, value)?).map_err(|_| invalid_number(context, value))?;
                state.note.octave_read = true;
            }
            Tag::Alter => state.note.alter = parse_alter(context, value)?,
            Tag::Voice => state.note.voice = Some(value.to_string()),
            Tag::RootStep => state.pending_harmony.root = Some(value.parse::<Step>()?),
            Tag::RootAlter => state.pending_harmony.alter = parse_alter(context, value)?,
            Tag::Kind => state.pending_harmony.kind = Some(value.to_string()),
            Tag::Part
            | Tag::Note
            | Tag::Pitch
            | Tag::Rest
            | Tag::Chord
            | Tag::Tie
            | Tag::Staccato
            | Tag::Backup
            | Tag::Forward
            | Tag::Harmony
            | Tag::Other => {}
        }
        Ok(())
    }

    fn end<S: TrackSink + ?Sized>(&mut self, tag: Tag, sink: &mut S) -> Result<()> {
        self.state.context = None;
        match tag {
            Tag::Pitch => {
                let note = &mut self.state.note;
                if note.step_read && note.octave_read {
                    note.pitch_read = true;
                }
                note.step_read = false;
                note.octave_read = false;
            }
            Tag::Harmony => self.end_harmony()?,
            Tag::Note => self.end_note()?,
            Tag::Backup => {
                if !self.state.note.duration_read {
                    return Err(ConvertError::MissingDurationForBackup);
                }
                self.state.timing.rewind(self.state.carried.duration)?;
                self.state.note.duration_read = false;
            }
            Tag::Forward => {
                if !self.state.note.duration_read {
                    return Err(ConvertError::MissingDurationForForward);
                }
                self.state.timing.advance(self.state.carried.duration)?;
                self.state.note.duration_read = false;
            }
            Tag::Part => self.end_part(sink)?,
            Tag::Step
            | Tag::Octave
            | Tag::Alter
            | Tag::Rest
            | Tag::Chord
            | Tag::Duration
            | Tag::Voice
            | Tag::Tie
            | Tag::Staccato
            | Tag::Divisions
            | Tag::Beats
            | Tag::BeatType
            | Tag::RootStep
            | Tag::RootAlter
            | Tag::Kind
            | Tag::Other => {}
        }
        Ok(())
    }

    fn end_harmony(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.state.pending_harmony);
        let (Some(root), Some(kind)) = (pending.root, pending.kind) else {
            log::debug!("[HARMONY] ignoring chord symbol without root or kind");
            return Ok(());
        };
        let now = self.seconds(self.state.timing.cursor)?;
        if let Some(span) = self.state.open_span.take() {
            self.close_span(span, now)?;
        }
        log::debug!(
            "[HARMONY] Starting: {:?} ({}) {} - start time: {} ({})",
            root,
            pending.alter,
            kind,
            now,
            self.state.timing.cursor
        );
        self.state.open_span = Some(OpenSpan {
            root,
            alter: pending.alter,
            kind,
            start: now,
        });
        Ok(())
    }

    /// Expand a finished chord span into one harmony event per chord tone.
    fn close_span(&mut self, span: OpenSpan, end: f64) -> Result<()> {
        let table = self.table;
        let offsets = table.lookup(&span.kind)?;
        if end <= span.start {
            log::warn!(
                "[HARMONY] Duration not valid - start time: {} - end time: {}",
                span.start,
                end
            );
            return Ok(());
        }
        let octave = self.state.carried.octave;
        let base = midi_pitch(span.root, octave, span.alter).ok_or_else(|| pitch_overflow(octave, span.alter))?;
        let pitches = offsets
            .iter()
            .map(|offset| base.checked_add(*offset).ok_or_else(|| pitch_overflow(octave, span.alter)))
            .collect::<Result<Vec<_>>>()?;
        for pitch in pitches {
            self.state.harmony.push(NoteEvent::new(span.start, end, pitch));
        }
        log::debug!(
            "[HARMONY] Finishing: {:?} ({}) {} - start time: {} - end time: {} - base pitch: {}",
            span.root,
            span.alter,
            span.kind,
            span.start,
            end,
            base
        );
        Ok(())
    }

    fn end_note(&mut self) -> Result<()> {
        if !self.state.note.duration_read {
            return Err(ConvertError::MissingDuration);
        }
        let duration = self.state.carried.duration;
        let note = &self.state.note;

        if !note.rest && !note.suppressed {
            let step = match self.state.carried.step {
                Some(step) if note.pitch_read => step,
                _ => return Err(ConvertError::MissingPitch),
            };
            let start = self.seconds(self.state.timing.cursor)?;
            let end = start + self.seconds(duration)?;
            let (octave, alter) = (self.state.carried.octave, self.state.note.alter);
            let pitch = midi_pitch(step, octave, alter).ok_or_else(|| pitch_overflow(octave, alter))?;
            self.state.melody.push(NoteEvent::new(start, end, pitch));
            log::debug!("[NOTE] start: {} - end: {} - pitch: {}", start, end, pitch);

            let state = &mut self.state;
            let voice = state.note.voice.clone().unwrap_or_else(|| "1".to_string());
            let tie_open = state.ties.entry(voice).or_insert(false);
            // Voice is only known once the note closes, so tie markers apply here
            match state.note.tie {
                Some(TieKind::Start) => *tie_open = true,
                Some(TieKind::Stop) => *tie_open = false,
                None => {}
            }

            // The articulation of a chord is written on its first note only
            if state.note.chord {
                state.note.staccato = state.carried.previous_staccato;
            }
        }

        if !self.state.note.suppressed {
            self.state.timing.advance(duration)?;
        }
        self.state.end_note();
        Ok(())
    }

    fn end_part<S: TrackSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if let Some(span) = self.state.open_span.take() {
            let now = self.seconds(self.state.timing.cursor)?;
            self.close_span(span, now)?;
        }
        if self.state.harmony.is_empty() {
            return Err(ConvertError::NoHarmonyDetected);
        }

        let offset = if self.remove_silence {
            let offset = self
                .state
                .melody
                .iter()
                .chain(self.state.harmony.iter())
                .map(|n| n.start)
                .fold(f64::INFINITY, f64::min);
            log::debug!("[END] Removing silence - offset: {}", offset);
            offset
        } else {
            0.0
        };

        let tracks = Tracks {
            part_id: self.state.part_id.clone(),
            melody: self.state.melody.iter().map(|n| n.shifted(offset)).collect(),
            harmony: self.state.harmony.iter().map(|n| n.shifted(offset)).collect(),
            total_length: self.total_length,
        };
        log::debug!(
            "[END] part {}: {} melody notes, {} harmony notes",
            tracks.part_id.as_deref().unwrap_or("(no id)"),
            tracks.melody.len(),
            tracks.harmony.len()
        );
        sink.accept(tracks)
    }

    /// Convert a position or length in divisions to seconds
    fn seconds(&self, units: i64) -> Result<f64> {
        let divisions = self.state.timing.divisions.ok_or(ConvertError::DivisionsNotSet)?;
        Ok(self.seconds_per_quarter * units as f64 / divisions as f64)
    }
}

fn invalid_number(tag: Tag, value: &str) -> ConvertError {
    ConvertError::InvalidNumber {
        element: tag.name().to_string(),
        value: value.to_string(),
    }
}

fn pitch_overflow(octave: i32, alter: i32) -> ConvertError {
    ConvertError::InvalidNumber {
        element: "octave".to_string(),
        value: format!("{} (alter {})", octave, alter),
    }
}

fn parse_int(tag: Tag, value: &str) -> Result<i64> {
    value.parse().map_err(|_| invalid_number(tag, value))
}

/// Composite meters such as `3+2` add up their parts.
fn parse_beats(value: &str) -> Result<i64> {
    value
        .split('+')
        .try_fold(0i64, |total, part| {
            let beats = parse_int(Tag::Beats, part.trim())?;
            total
                .checked_add(beats)
                .ok_or_else(|| invalid_number(Tag::Beats, value))
        })
}

/// Semitone alteration. A bare `-` means flat; microtonal values round to the
/// nearest semitone.
fn parse_alter(tag: Tag, value: &str) -> Result<i32> {
    if value == "-" {
        log::warn!("alteration written as '-', reading it as -1");
        return Ok(-1);
    }
    if let Ok(alter) = value.parse::<i32>() {
        return Ok(alter);
    }
    let alter: f64 = value.parse().map_err(|_| invalid_number(tag, value))?;
    if alter.fract() != 0.0 {
        log::warn!("microtonal alteration {} rounded", alter);
    }
    Ok(alter.round() as i32)
}
