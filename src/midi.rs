//! MIDI output
//!
//! Renders [`Tracks`] as a Standard MIDI File, format 1:
//! - track 0: tempo (the conversion bpm, nothing else)
//! - track 1: `Melody`, channel 0
//! - track 2: `Harmony`, channel 1
//!
//! Both instrument tracks use the same program and a fixed velocity.

use std::fs;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use crate::config::ConvertOptions;
use crate::convert::{NoteEvent, Tracks};
use crate::error::{ConvertError, Result};

const MELODY_CHANNEL: u8 = 0;
const HARMONY_CHANNEL: u8 = 1;
const MAX_TICK: u64 = (1 << 28) - 1;

/// Encode both tracks as SMF bytes
pub fn write_smf(tracks: &Tracks, options: &ConvertOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let clock = Clock::new(options);

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::new(options.ticks_per_quarter)),
        },
        tracks: vec![
            build_conductor_track(options),
            build_instrument_track(b"Melody", &tracks.melody, MELODY_CHANNEL, options, &clock)?,
            build_instrument_track(b"Harmony", &tracks.harmony, HARMONY_CHANNEL, options, &clock)?,
        ],
    };

    let mut out = Vec::new();
    smf.write(&mut out)
        .map_err(|e| ConvertError::Midi(format!("Failed to write MIDI: {}", e)))?;
    Ok(out)
}

/// Encode and write to `path`
pub fn save_smf(tracks: &Tracks, options: &ConvertOptions, path: impl AsRef<Path>) -> Result<()> {
    let bytes = write_smf(tracks, options)?;
    fs::write(path.as_ref(), bytes)?;
    log::debug!("[END] Wrote out .mid at: {}", path.as_ref().display());
    Ok(())
}

/// Seconds to ticks at a fixed tempo
struct Clock {
    ticks_per_second: f64,
}

impl Clock {
    fn new(options: &ConvertOptions) -> Self {
        Clock {
            ticks_per_second: options.ticks_per_quarter as f64 * options.bpm / 60.0,
        }
    }

    fn ticks(&self, seconds: f64) -> Result<u64> {
        let ticks = (seconds * self.ticks_per_second).round();
        if !(0.0..=MAX_TICK as f64).contains(&ticks) {
            return Err(ConvertError::Midi(format!("time {}s cannot be encoded", seconds)));
        }
        Ok(ticks as u64)
    }
}

fn build_conductor_track<'a>(options: &ConvertOptions) -> Track<'a> {
    let microseconds_per_quarter = options.microseconds_per_quarter();
    vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(microseconds_per_quarter))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]
}

fn build_instrument_track<'a>(
    name: &'a [u8],
    notes: &[NoteEvent],
    channel: u8,
    options: &ConvertOptions,
    clock: &Clock,
) -> Result<Track<'a>> {
    let channel = u4::new(channel);
    let mut timed: Vec<(u64, bool, MidiMessage)> = Vec::with_capacity(notes.len() * 2);

    for note in notes {
        let key = midi_key(note.pitch)?;
        let start = clock.ticks(note.start)?;
        let end = clock.ticks(note.end)?.max(start);
        timed.push((
            start,
            true,
            MidiMessage::NoteOn {
                key,
                vel: u7::new(options.velocity),
            },
        ));
        timed.push((
            end,
            false,
            MidiMessage::NoteOff {
                key,
                vel: u7::new(0),
            },
        ));
    }

    // Note-offs sort before note-ons on the same tick so repeated pitches retrigger
    timed.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    let mut events = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name)),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(options.program),
                },
            },
        },
    ];

    let mut prev_tick = 0u64;
    for (tick, _, message) in timed {
        events.push(TrackEvent {
            delta: u28::new((tick - prev_tick) as u32),
            kind: TrackEventKind::Midi { channel, message },
        });
        prev_tick = tick;
    }

    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(events)
}

fn midi_key(pitch: i32) -> Result<u7> {
    u8::try_from(pitch)
        .ok()
        .filter(|p| *p <= 127)
        .map(u7::new)
        .ok_or(ConvertError::PitchOutOfRange(pitch))
}
