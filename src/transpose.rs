//! Key estimation and transposition
//!
//! Estimates the tonal center of converted tracks and shifts every pitch so
//! major keys land on C and minor keys on A.
//!
//! The estimate correlates a duration-weighted pitch-class histogram of both
//! tracks with the Krumhansl-Kessler key profiles, rotated to each of the 12
//! tonics.

use std::fmt;

use crate::convert::Tracks;

const MAJOR_PROFILE: [f64; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];
const MINOR_PROFILE: [f64; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

const PITCH_CLASS_NAMES: [&str; 12] = ["C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    /// Pitch class of the tonic, 0 = C
    pub tonic: u8,
    pub mode: Mode,
}

impl Key {
    /// Semitones that move this key to C major or A minor.
    ///
    /// Always the shorter way round; a tritone away moves up.
    ///
    /// ```
    /// use scoremidi::transpose::{Key, Mode};
    ///
    /// assert_eq!(Key { tonic: 7, mode: Mode::Major }.shift_to_reference(), 5);  // G -> C
    /// assert_eq!(Key { tonic: 2, mode: Mode::Major }.shift_to_reference(), -2); // D -> C
    /// assert_eq!(Key { tonic: 4, mode: Mode::Minor }.shift_to_reference(), 5);  // E -> A
    /// ```
    pub fn shift_to_reference(self) -> i32 {
        let target = match self.mode {
            Mode::Major => 0,
            Mode::Minor => 9,
        };
        let distance = (self.tonic as i32 - target).rem_euclid(12);
        if distance <= 5 {
            -distance
        } else {
            12 - distance
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", PITCH_CLASS_NAMES[self.tonic as usize % 12], mode)
    }
}

/// Most likely key of the tracks, or `None` when nothing sounds.
pub fn estimate_key(tracks: &Tracks) -> Option<Key> {
    let mut histogram = [0.0; 12];
    for note in tracks.all_notes() {
        let weight = note.duration().max(0.0);
        histogram[note.pitch.rem_euclid(12) as usize] += weight;
    }
    if histogram.iter().all(|w| *w == 0.0) {
        return None;
    }

    let mut best: Option<(Key, f64)> = None;
    for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
        for tonic in 0..12u8 {
            let rotated: Vec<f64> = (0..12).map(|pc| profile[(pc + 12 - tonic as usize) % 12]).collect();
            let score = correlation(&histogram, &rotated);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((Key { tonic, mode }, score));
            }
        }
    }
    best.map(|(key, _)| key)
}

/// Shift every pitch by `semitones`
pub fn transpose(tracks: &mut Tracks, semitones: i32) {
    for note in tracks.all_notes_mut() {
        // Out-of-range pitches are rejected when writing MIDI
        note.pitch = note.pitch.saturating_add(semitones);
    }
}

/// Estimate the key and move it to C major / A minor. Returns the detected
/// key and the shift applied.
pub fn to_reference(tracks: &mut Tracks) -> Option<(Key, i32)> {
    let key = estimate_key(tracks)?;
    let shift = key.shift_to_reference();
    transpose(tracks, shift);
    log::debug!("[TRANSPOSE] detected {}, shifting by {} semitones", key, shift);
    Some((key, shift))
}

fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NoteEvent;

    /// Scale degrees laid out one beat each, plus a tonic triad in the harmony
    fn tracks_in(scale: &[i32], triad: &[i32]) -> Tracks {
        let melody = scale
            .iter()
            .enumerate()
            .map(|(i, p)| NoteEvent::new(i as f64, i as f64 + 1.0, *p))
            .collect();
        let len = scale.len() as f64;
        let harmony = triad.iter().map(|p| NoteEvent::new(0.0, len, *p)).collect();
        Tracks {
            melody,
            harmony,
            ..Default::default()
        }
    }

    #[test]
    fn test_estimates_g_major() {
        let tracks = tracks_in(&[67, 69, 71, 72, 74, 76, 78, 79, 74, 71, 67], &[55, 59, 62]);
        assert_eq!(estimate_key(&tracks), Some(Key { tonic: 7, mode: Mode::Major }));
    }

    #[test]
    fn test_estimates_d_minor() {
        let tracks = tracks_in(&[62, 64, 65, 67, 69, 70, 73, 74, 69, 65, 62], &[50, 53, 57]);
        assert_eq!(estimate_key(&tracks), Some(Key { tonic: 2, mode: Mode::Minor }));
    }

    #[test]
    fn test_empty_tracks_have_no_key() {
        assert_eq!(estimate_key(&Tracks::default()), None);
    }

    #[test]
    fn test_shift_table() {
        let majors = [0, -1, -2, -3, -4, -5, 6, 5, 4, 3, 2, 1];
        let minors = [-3, -4, -5, 6, 5, 4, 3, 2, 1, 0, -1, -2];
        for tonic in 0..12u8 {
            let major = Key { tonic, mode: Mode::Major };
            let minor = Key { tonic, mode: Mode::Minor };
            assert_eq!(major.shift_to_reference(), majors[tonic as usize], "{}", major);
            assert_eq!(minor.shift_to_reference(), minors[tonic as usize], "{}", minor);
        }
    }

    #[test]
    fn test_transpose_saturates() {
        let mut tracks = tracks_in(&[i32::MAX - 1], &[]);
        transpose(&mut tracks, 5);
        assert_eq!(tracks.melody[0].pitch, i32::MAX);
    }

    #[test]
    fn test_to_reference_moves_g_major_to_c() {
        let mut tracks = tracks_in(&[67, 69, 71, 72, 74, 76, 78, 79], &[55, 59, 62]);
        let (key, shift) = to_reference(&mut tracks).unwrap();
        assert_eq!(key.to_string(), "G major");
        assert_eq!(shift, 5);
        assert_eq!(tracks.melody[0].pitch, 72);
        assert_eq!(tracks.harmony[0].pitch, 60);
        assert_eq!(estimate_key(&tracks), Some(Key { tonic: 0, mode: Mode::Major }));
    }
}
