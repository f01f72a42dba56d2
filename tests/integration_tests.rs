//! Integration tests for scoremidi
//!
//! Tests the file pipeline from MusicXML on disk to Standard MIDI Files.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use scoremidi::{
    batch, convert_file, convert_file_to_tracks, convert_file_with_table, ChordTable, ConvertError, ConvertOptions,
};
use zip::write::FileOptions;
use zip::ZipWriter;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#;

fn lead_sheet(kind: &str) -> String {
    format!(
        r#"{}
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Voice</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>2</divisions>
        <key><fifths>0</fifths></key>
        <time><beats>4</beats><beat-type>4</beat-type></time>
      </attributes>
      <harmony>
        <root><root-step>C</root-step></root>
        <kind text="">{}</kind>
      </harmony>
      <note>
        <pitch><step>C</step><octave>5</octave></pitch>
        <duration>2</duration>
        <voice>1</voice>
        <type>quarter</type>
      </note>
      <note>
        <pitch><step>E</step><octave>5</octave></pitch>
        <duration>2</duration>
        <voice>1</voice>
        <type>quarter</type>
      </note>
      <note>
        <rest/>
        <duration>4</duration>
        <voice>1</voice>
        <type>half</type>
      </note>
    </measure>
  </part>
</score-partwise>
"#,
        HEADER, kind
    )
}

/// (channel, key) of every note-on in a track
fn note_ons(smf: &Smf, track: usize) -> Vec<(u8, u8)> {
    smf.tracks[track]
        .iter()
        .filter_map(|event| match event.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, .. },
            } => Some((channel.as_int(), key.as_int())),
            _ => None,
        })
        .collect()
}

fn tempo(smf: &Smf) -> Option<u32> {
    smf.tracks[0].iter().find_map(|event| match event.kind {
        TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
        _ => None,
    })
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

/// Compressed MusicXML with a container pointing at `score.xml`
fn write_mxl(dir: &Path, name: &str, contents: &str) {
    let mut zip = ZipWriter::new(File::create(dir.join(name)).unwrap());
    zip.start_file("META-INF/container.xml", FileOptions::default()).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<container><rootfiles><rootfile full-path="score.xml"/></rootfiles></container>"#,
    )
    .unwrap();
    zip.start_file("score.xml", FileOptions::default()).unwrap();
    zip.write_all(contents.as_bytes()).unwrap();
    zip.finish().unwrap();
}

fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn test_convert_file_writes_melody_and_harmony_tracks() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "song.xml", &lead_sheet("major"));
    let output = dir.path().join("song.mid");

    let tracks = convert_file(dir.path().join("song.xml"), &output, &ConvertOptions::default()).unwrap();
    assert_eq!(tracks.melody.len(), 2);
    assert_eq!(tracks.harmony.len(), 3);
    assert_eq!(tracks.total_length, 4);

    let bytes = fs::read(&output).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 3);
    assert_eq!(tempo(&smf), Some(500_000));
    assert_eq!(note_ons(&smf, 1), vec![(0, 60), (0, 64)]);
    assert_eq!(note_ons(&smf, 2), vec![(1, 60), (1, 64), (1, 67)]);
}

#[test]
fn test_failed_conversion_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "song.xml", &lead_sheet("pedal"));
    let output = dir.path().join("song.mid");

    let err = convert_file(dir.path().join("song.xml"), &output, &ConvertOptions::default()).unwrap_err();
    assert_eq!(err.unsupported_quality(), Some("pedal"));
    assert!(!output.exists());
}

#[test]
fn test_sanitized_copy_removed_on_every_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let options = ConvertOptions {
        temp_dir: Some(scratch.path().to_path_buf()),
        ..Default::default()
    };
    write(dir.path(), "good.xml", &lead_sheet("major"));
    write(dir.path(), "pedal.xml", &lead_sheet("pedal"));
    write(dir.path(), "broken.xml", "<score-partwise><part><note>");

    convert_file(dir.path().join("good.xml"), dir.path().join("good.mid"), &options).unwrap();
    assert!(dir_is_empty(scratch.path()));

    let err = convert_file(dir.path().join("pedal.xml"), dir.path().join("pedal.mid"), &options).unwrap_err();
    assert!(matches!(err, ConvertError::UnknownChordQuality(_)));
    assert!(dir_is_empty(scratch.path()));

    assert!(convert_file(dir.path().join("broken.xml"), dir.path().join("broken.mid"), &options).is_err());
    assert!(dir_is_empty(scratch.path()));
}

#[test]
fn test_convert_mxl_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_mxl(dir.path(), "song.mxl", &lead_sheet("major"));
    let output = dir.path().join("song.mid");

    let tracks = convert_file(dir.path().join("song.mxl"), &output, &ConvertOptions::default()).unwrap();
    assert_eq!(tracks.melody.len(), 2);

    let bytes = fs::read(&output).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(note_ons(&smf, 1), vec![(0, 60), (0, 64)]);
    assert_eq!(note_ons(&smf, 2), vec![(1, 60), (1, 64), (1, 67)]);
}

#[test]
fn test_injected_table_overrides_options() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "song.xml", &lead_sheet("pedal"));
    let table = ChordTable::from_yaml_str("pedal: [0, 7]").unwrap();
    // Never read: the table passed in is used
    let options = ConvertOptions {
        chord_table: Some(dir.path().join("missing.yaml")),
        ..Default::default()
    };

    let tracks = convert_file_with_table(dir.path().join("song.xml"), dir.path().join("song.mid"), &options, &table)
        .unwrap();
    assert_eq!(tracks.harmony.iter().map(|n| n.pitch).collect::<Vec<_>>(), vec![60, 67]);
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_file_to_tracks(dir.path().join("missing.xml"), &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
}

#[test]
fn test_options_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "song.xml", &lead_sheet("major"));
    write(dir.path(), "options.yaml", "bpm: 60\nprogram: 24\nvelocity: 90\n");
    let options = ConvertOptions::from_file(dir.path().join("options.yaml")).unwrap();
    let output = dir.path().join("song.mid");

    let tracks = convert_file(dir.path().join("song.xml"), &output, &options).unwrap();
    // One quarter note lasts a second at 60 bpm
    assert_eq!(tracks.melody[0].end, 1.0);

    let bytes = fs::read(&output).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(tempo(&smf), Some(1_000_000));
    let programs: Vec<u8> = smf.tracks[1..]
        .iter()
        .flat_map(|track| track.iter())
        .filter_map(|event| match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } => Some(program.as_int()),
            _ => None,
        })
        .collect();
    assert_eq!(programs, vec![24, 24]);
    let velocities: Vec<u8> = smf.tracks[1]
        .iter()
        .filter_map(|event| match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { vel, .. },
                ..
            } => Some(vel.as_int()),
            _ => None,
        })
        .collect();
    assert_eq!(velocities, vec![90, 90]);
}

#[test]
fn test_last_part_wins() {
    let xml = format!(
        r#"{}
<score-partwise>
  <part id="P1"><measure>
    <attributes><divisions>1</divisions></attributes>
    <harmony><root><root-step>F</root-step></root><kind>major</kind></harmony>
    <note><pitch><step>F</step><octave>4</octave></pitch><duration>1</duration></note>
  </measure></part>
  <part id="P2"><measure>
    <attributes><divisions>1</divisions></attributes>
    <note><pitch><step>A</step><octave>4</octave></pitch><duration>2</duration></note>
  </measure></part>
</score-partwise>"#,
        HEADER
    );
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "duet.xml", &xml);

    let tracks = convert_file_to_tracks(dir.path().join("duet.xml"), &ConvertOptions::default()).unwrap();
    assert_eq!(tracks.part_id.as_deref(), Some("P2"));
    assert_eq!(tracks.melody.len(), 1);
    assert_eq!(tracks.melody[0].pitch, 57);
    // Chord symbols of the first part carry over
    assert_eq!(tracks.harmony.len(), 3);
}

#[test]
fn test_batch_report() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "a_good.xml", &lead_sheet("major"));
    write(input.path(), "b_pedal.musicxml", &lead_sheet("pedal"));
    write(input.path(), "c_pedal.xml", &lead_sheet("pedal"));
    write(input.path(), "d_other.xml", &lead_sheet("none"));
    write(
        input.path(),
        "e_no_chords.xml",
        &lead_sheet("major").replace("<harmony>", "<!--").replace("</harmony>", "-->"),
    );
    write(input.path(), "readme.txt", "not a score");

    let out_dir = output.path().join("midi");
    let report = batch::convert_dir(input.path(), &out_dir, &ConvertOptions::default()).unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.converted, 1);
    assert_eq!(report.failed, 4);
    assert_eq!(report.converted_percent, 20.0);
    assert_eq!(report.failed_percent, 80.0);
    assert_eq!(report.unsupported_qualities.len(), 2);
    assert_eq!(report.unsupported_qualities["pedal"], "b_pedal.musicxml");
    assert_eq!(report.unsupported_qualities["none"], "d_other.xml");

    assert!(out_dir.join("a_good.mid").exists());
    assert!(!out_dir.join("b_pedal.mid").exists());
    assert!(!out_dir.join("e_no_chords.mid").exists());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["converted"], 1);
    assert_eq!(json["unsupported-qualities"]["pedal"], "b_pedal.musicxml");
}

#[test]
fn test_batch_with_custom_table_and_archives() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let table = input.path().join("chords.yaml");
    fs::write(&table, "pedal: [0, 12]\nmajor: [0, 4, 7]\n").unwrap();
    write(input.path(), "a.xml", &lead_sheet("pedal"));
    write(input.path(), "b.xml", &lead_sheet("major"));
    write_mxl(input.path(), "c.mxl", &lead_sheet("pedal"));
    write(input.path(), "d.xml", &lead_sheet("minor"));

    let options = ConvertOptions {
        chord_table: Some(table),
        ..Default::default()
    };
    let report = batch::convert_dir(input.path(), output.path(), &options).unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.converted, 3);
    assert!(output.path().join("c.mid").exists());
    // The custom table replaces the built-in one entirely
    assert_eq!(report.unsupported_qualities["minor"], "d.xml");
}

#[test]
fn test_batch_unreadable_table_fails_up_front() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "a.xml", &lead_sheet("major"));
    let options = ConvertOptions {
        chord_table: Some(input.path().join("missing.yaml")),
        ..Default::default()
    };

    let out_dir = output.path().join("midi");
    let err = batch::convert_dir(input.path(), &out_dir, &options).unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
    assert!(!out_dir.exists());
}

#[test]
fn test_batch_missing_input_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = batch::convert_dir(dir.path().join("nope"), dir.path().join("out"), &ConvertOptions::default());
    assert!(result.is_err());
}
