//! Scale tables and the degree resolver
//!
//! Scales are stored as step intervals in semitones. Steps may be fractional
//! when a scale comes from a tuning file, in which case resolved pitches carry a
//! 14-bit pitch bend alongside the integral note number.

use crate::tuning;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

pub const MAJOR: [f64; 7] = [2.0, 2.0, 1.0, 2.0, 2.0, 2.0, 1.0];

/// Major scale as a 12-bit pitch class set
pub const MAJOR_NUMBER: u32 = 2741;

/// Center of the 14-bit pitch bend range
pub const BEND_CENTER: i64 = 8192;
const BEND_MAX: i64 = 16383;
/// Semitones covered by a full bend in either direction
const BEND_RANGE_SEMITONES: f64 = 2.0;

static SCALES: &[(&str, &[f64])] = &[
    ("MAJOR", &MAJOR),
    ("IONIAN", &MAJOR),
    ("DORIAN", &[2.0, 1.0, 2.0, 2.0, 2.0, 1.0, 2.0]),
    ("PHRYGIAN", &[1.0, 2.0, 2.0, 2.0, 1.0, 2.0, 2.0]),
    ("LYDIAN", &[2.0, 2.0, 2.0, 1.0, 2.0, 2.0, 1.0]),
    ("MIXOLYDIAN", &[2.0, 2.0, 1.0, 2.0, 2.0, 1.0, 2.0]),
    ("MINOR", &[2.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0]),
    ("AEOLIAN", &[2.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0]),
    ("LOCRIAN", &[1.0, 2.0, 2.0, 1.0, 2.0, 2.0, 2.0]),
    ("HARMONIC_MINOR", &[2.0, 1.0, 2.0, 2.0, 1.0, 3.0, 1.0]),
    ("MELODIC_MINOR", &[2.0, 1.0, 2.0, 2.0, 2.0, 2.0, 1.0]),
    ("PENTATONIC", &[2.0, 2.0, 3.0, 2.0, 3.0]),
    ("MAJOR_PENTATONIC", &[2.0, 2.0, 3.0, 2.0, 3.0]),
    ("MINOR_PENTATONIC", &[3.0, 2.0, 2.0, 3.0, 2.0]),
    ("BLUES", &[3.0, 2.0, 1.0, 1.0, 3.0, 2.0]),
    ("WHOLE_TONE", &[2.0, 2.0, 2.0, 2.0, 2.0, 2.0]),
    ("CHROMATIC", &[1.0; 12]),
    ("DIMINISHED", &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]),
    ("AUGMENTED", &[3.0, 1.0, 3.0, 1.0, 3.0, 1.0]),
    ("HIRAJOSHI", &[2.0, 1.0, 4.0, 1.0, 4.0]),
    ("IN_SEN", &[1.0, 4.0, 2.0, 3.0, 2.0]),
    ("EGYPTIAN", &[2.0, 3.0, 2.0, 3.0, 2.0]),
    ("PROMETHEUS", &[2.0, 2.0, 2.0, 3.0, 1.0, 2.0]),
];

/// Upper-case a scale name and normalize separators (`minor pentatonic` -> `MINOR_PENTATONIC`)
pub fn canonical_scale_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Look up a named scale's step intervals
pub fn named_scale(name: &str) -> Option<&'static [f64]> {
    let canonical = canonical_scale_name(name);
    SCALES
        .iter()
        .find(|(scale_name, _)| *scale_name == canonical)
        .map(|(_, steps)| *steps)
}

/// An ordered list of step intervals spanning one period (usually an octave)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    name: Option<String>,
    intervals: Vec<f64>,
}

impl Scale {
    pub fn major() -> Self {
        Scale {
            name: Some("MAJOR".to_string()),
            intervals: MAJOR.to_vec(),
        }
    }

    pub fn named(name: &str) -> Option<Self> {
        named_scale(name).map(|steps| Scale {
            name: Some(canonical_scale_name(name)),
            intervals: steps.to_vec(),
        })
    }

    /// Build from explicit step intervals; degenerate tables fall back to major
    pub fn from_intervals(intervals: Vec<f64>) -> Self {
        let span: f64 = intervals.iter().sum();
        if intervals.is_empty() || !span.is_finite() || span <= 0.0 {
            warn!(?intervals, "degenerate interval table, using major scale");
            return Scale::major();
        }
        Scale {
            name: None,
            intervals,
        }
    }

    /// Build from a 12-bit pitch class set number (2741 is major)
    pub fn from_number(number: u32) -> Self {
        let steps = scale_to_steps(&number_to_scale(number));
        Scale::from_intervals(steps.into_iter().map(|s| s as f64).collect())
    }

    /// Equal division of the octave into `divisions` steps
    pub fn edo(divisions: usize) -> Self {
        if divisions == 0 {
            return Scale::major();
        }
        Scale {
            name: Some(format!("{}EDO", divisions)),
            intervals: vec![12.0 / divisions as f64; divisions],
        }
    }

    /// Resolve a scale option: a known name, otherwise a tuning string.
    /// Anything unusable becomes the major scale.
    pub fn parse(spec: &str) -> Self {
        if let Some(scale) = Scale::named(spec) {
            return scale;
        }
        let intervals = tuning::parse(spec);
        if intervals.is_empty() {
            warn!(scale = spec, "unknown scale or malformed tuning, using major scale");
            return Scale::major();
        }
        Scale::from_intervals(intervals)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn intervals(&self) -> &[f64] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Total size of one period in semitones
    pub fn span(&self) -> f64 {
        self.intervals.iter().sum()
    }

    /// Offset of every degree from the root, starting at 0
    pub fn positions(&self) -> Vec<f64> {
        self.intervals
            .iter()
            .scan(0.0, |acc, step| {
                let position = *acc;
                *acc += step;
                Some(position)
            })
            .collect()
    }

    pub fn is_microtonal(&self) -> bool {
        self.intervals.iter().any(|step| step.fract() != 0.0)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::major()
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{:?}", self.intervals),
        }
    }
}

/// Result of resolving a scale degree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPitch {
    /// Integral MIDI note number
    pub note: i64,
    /// Exact (possibly fractional) note value
    pub value: f64,
    /// 14-bit pitch bend, present only for fractional values
    pub bend: Option<u16>,
}

/// Resolve a scale degree against a root note.
///
/// Degrees outside `[0, len)` carry into the octave by floor division, so
/// degree -1 of a seven note scale is degree 6 one octave down.
pub fn resolve_pitch(root: i64, degree: i64, intervals: &[f64], octave: i64, modifier: f64) -> ResolvedPitch {
    let intervals = if intervals.is_empty() || intervals.iter().sum::<f64>() <= 0.0 {
        &MAJOR[..]
    } else {
        intervals
    };
    let len = intervals.len() as i64;
    let octave = octave + degree.div_euclid(len);
    let degree = degree.rem_euclid(len) as usize;

    let span: f64 = intervals.iter().sum();
    let offset: f64 = intervals[..degree].iter().sum();
    let value = root as f64 + offset + octave as f64 * span + modifier;

    if (value - value.round()).abs() < 1e-9 {
        ResolvedPitch {
            note: value.round() as i64,
            value: value.round(),
            bend: None,
        }
    } else {
        let (note, bend) = resolve_pitch_bend(value);
        ResolvedPitch {
            note,
            value,
            bend: Some(bend),
        }
    }
}

/// Split a fractional note value into its integral note and a pitch bend
/// relative to it, assuming a bend range of two semitones.
pub fn resolve_pitch_bend(value: f64) -> (i64, u16) {
    let note = value.floor();
    let cents = 1200.0 * (midi_to_freq(value) / midi_to_freq(note)).log2();
    let offset = (cents / (BEND_RANGE_SEMITONES * 100.0) * BEND_CENTER as f64).round() as i64;
    let bend = (BEND_CENTER + offset).clamp(0, BEND_MAX);
    (note as i64, bend as u16)
}

pub fn midi_to_freq(note: f64) -> f64 {
    440.0 * 2f64.powf((note - 69.0) / 12.0)
}

pub fn freq_to_midi(freq: f64) -> f64 {
    12.0 * (freq / 440.0).log2() + 69.0
}

/// Parse a note name like `C`, `F#`, `Eb3` into a MIDI note number.
/// The octave defaults to 4 so `C` is 60.
pub fn note_name_to_midi(name: &str) -> Option<i64> {
    let mut chars = name.trim().chars().peekable();
    let interval = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut modifier = 0;
    while let Some(&c) = chars.peek() {
        match c {
            '#' | 's' => modifier += 1,
            'b' => modifier -= 1,
            _ => break,
        }
        chars.next();
    }

    let rest: String = chars.collect();
    let octave = if rest.is_empty() {
        4
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(12 + octave * 12 + interval + modifier)
}

/// Position of a MIDI note relative to a key and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchClass {
    pub degree: i64,
    pub octave: i64,
    /// Chromatic alteration needed when the note is outside the scale
    pub add: f64,
}

/// Keys on the sharp side of the circle of fifths spell outside notes as raised degrees
fn prefers_sharps(key: i64) -> bool {
    matches!(key.rem_euclid(12), 1 | 2 | 4 | 6 | 7 | 9 | 11)
}

/// Find the scale degree, octave and alteration that reproduce `note`.
/// Notes outside the scale are raised from the degree below in sharp keys and
/// lowered from the degree above otherwise.
pub fn midi_to_pitch_class(note: i64, key: i64, scale: &Scale) -> PitchClass {
    let span = scale.span();
    let positions = scale.positions();
    let relative = (note - key) as f64;
    let octave = (relative / span).floor() as i64;
    let within = relative - octave as f64 * span;

    if let Some(degree) = positions.iter().position(|p| (p - within).abs() < 1e-9) {
        return PitchClass {
            degree: degree as i64,
            octave,
            add: 0.0,
        };
    }

    let lower = positions.iter().rposition(|p| *p < within).unwrap_or(0);
    if prefers_sharps(key) {
        return PitchClass {
            degree: lower as i64,
            octave,
            add: within - positions[lower],
        };
    }
    match positions.get(lower + 1) {
        Some(upper) => PitchClass {
            degree: (lower + 1) as i64,
            octave,
            add: within - upper,
        },
        None => PitchClass {
            degree: 0,
            octave: octave + 1,
            add: within - span,
        },
    }
}

/// Decode a 12-bit pitch class set (bit i set means pitch class i).
/// Numbers outside 0..=4095 fall back to the major scale.
pub fn number_to_scale(number: u32) -> Vec<i64> {
    let number = if number > 4095 {
        warn!(number, "scale number out of range, using major");
        MAJOR_NUMBER
    } else {
        number
    };
    (0..12).filter(|bit| number & (1 << bit) != 0).collect()
}

pub fn scale_to_number(pitch_classes: &[i64]) -> u32 {
    pitch_classes
        .iter()
        .fold(0, |acc, pc| acc | 1 << pc.rem_euclid(12))
}

/// Steps between consecutive pitch classes, wrapping around the octave
pub fn scale_to_steps(pitch_classes: &[i64]) -> Vec<i64> {
    if pitch_classes.len() == 1 {
        return vec![12];
    }
    pitch_classes
        .iter()
        .enumerate()
        .map(|(i, pc)| (pitch_classes[(i + 1) % pitch_classes.len()] - pc).rem_euclid(12))
        .collect()
}

/// Running sum of steps, starting at 0
pub fn steps_to_scale(steps: &[i64]) -> Vec<i64> {
    std::iter::once(0)
        .chain(steps.iter().scan(0, |acc, step| {
            *acc += step;
            Some(*acc)
        }))
        .collect()
}

/// Every note of the scale within the piano range (21..=108)
pub fn all_scale_notes(scale: &Scale, key: i64) -> Vec<i64> {
    let span = scale.span();
    let positions = scale.positions();
    (21..=108)
        .filter(|note| {
            let relative = (note - key) as f64;
            let within = relative - (relative / span).floor() * span;
            positions.iter().any(|p| (p - within).abs() < 1e-9)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_major_degrees() {
        let notes: Vec<i64> = (1..=4).map(|d| resolve_pitch(60, d, &MAJOR, 0, 0.0).note).collect();
        assert_eq!(notes, vec![62, 64, 65, 67]);
    }

    #[test]
    fn test_negative_degree_wraps_down() {
        let pitch = resolve_pitch(60, -1, &MAJOR, 0, 0.0);
        assert_eq!(pitch.note, 59);
        assert_eq!(resolve_pitch(60, -7, &MAJOR, 0, 0.0).note, 48);
    }

    #[test]
    fn test_empty_intervals_use_major() {
        assert_eq!(resolve_pitch(60, 2, &[], 0, 0.0).note, 64);
        assert_eq!(Scale::from_intervals(vec![]), Scale::major());
    }

    #[test]
    fn test_microtonal_bend() {
        let pitch = resolve_pitch(60, 1, &[2.5, 9.5], 0, 0.0);
        assert_eq!(pitch.note, 62);
        assert!((pitch.value - 62.5).abs() < 1e-9);
        // half a semitone is a quarter of the two semitone range
        assert_eq!(pitch.bend, Some(8192 + 2048));
    }

    #[test]
    fn test_pitch_bend_range() {
        let (note, bend) = resolve_pitch_bend(69.99);
        assert_eq!(note, 69);
        assert!(bend > 8192 && bend <= 16383);
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name_to_midi("C"), Some(60));
        assert_eq!(note_name_to_midi("D3"), Some(50));
        assert_eq!(note_name_to_midi("F#"), Some(66));
        assert_eq!(note_name_to_midi("Eb"), Some(63));
        assert_eq!(note_name_to_midi("H"), None);
    }

    #[test]
    fn test_freq_conversion() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-9);
        assert!((freq_to_midi(261.6255653005986) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_named_scales() {
        assert_eq!(Scale::named("chromatic").map(|s| s.len()), Some(12));
        assert_eq!(named_scale("minor pentatonic"), Some(&[3.0, 2.0, 2.0, 3.0, 2.0][..]));
        assert!(Scale::named("no-such-scale").is_none());
        assert_eq!(Scale::parse("no-such-scale"), Scale::major());
    }

    #[test]
    fn test_scale_numbers() {
        assert_eq!(scale_to_steps(&number_to_scale(2741)), vec![2, 2, 1, 2, 2, 2, 1]);
        assert_eq!(number_to_scale(349), vec![0, 2, 3, 4, 6, 8]);
        assert_eq!(scale_to_number(&number_to_scale(349)), 349);
        assert_eq!(steps_to_scale(&[3, 2, 2, 3, 2]), vec![0, 3, 5, 7, 10, 12]);
        assert_eq!(number_to_scale(1193), vec![0, 3, 5, 7, 10]);
        assert_eq!(scale_to_number(&steps_to_scale(&[3, 2, 2, 3, 2])), 1193);
        assert_eq!(number_to_scale(5000), number_to_scale(2741));
        assert_eq!(Scale::from_number(2741).intervals(), &MAJOR);
    }

    #[test]
    fn test_midi_to_pitch_class() {
        let major = Scale::major();
        assert_eq!(midi_to_pitch_class(60, 60, &major).degree, 0);
        assert_eq!(midi_to_pitch_class(60, 62, &major).degree, 5);
        assert_eq!(midi_to_pitch_class(3, 60, &major).degree, 2);

        let flat_seven = midi_to_pitch_class(70, 60, &major);
        assert_eq!((flat_seven.degree, flat_seven.octave, flat_seven.add), (6, 0, -1.0));
    }

    #[test]
    fn test_all_scale_notes() {
        let notes = all_scale_notes(&Scale::major(), 60);
        assert_eq!(&notes[..6], &[21, 23, 24, 26, 28, 29]);
        assert_eq!(notes.last(), Some(&108));

        let d_pentatonic = all_scale_notes(&Scale::parse("minor pentatonic"), 62);
        assert_eq!(&d_pentatonic[..5], &[21, 24, 26, 29, 31]);
    }

    #[test]
    fn test_edo() {
        let scale = Scale::edo(24);
        assert_eq!(scale.len(), 24);
        assert!((scale.span() - 12.0).abs() < 1e-9);
        assert_eq!(resolve_pitch(60, 1, scale.intervals(), 0, 0.0).bend, Some(8192 + 2048));
    }

    proptest! {
        #[test]
        fn degree_plus_length_is_one_octave_up(degree in -50i64..50, len in 1usize..13) {
            let intervals: Vec<f64> = (0..len).map(|i| 1.0 + (i % 3) as f64).collect();
            let span: f64 = intervals.iter().sum();
            let low = resolve_pitch(60, degree, &intervals, 0, 0.0);
            let high = resolve_pitch(60, degree + len as i64, &intervals, 0, 0.0);
            prop_assert!((high.value - low.value - span).abs() < 1e-9);
        }

        #[test]
        fn pitch_class_round_trips(note in 0i64..128, key in 48i64..72) {
            let scale = Scale::major();
            let pc = midi_to_pitch_class(note, key, &scale);
            let resolved = resolve_pitch(key, pc.degree, scale.intervals(), pc.octave, pc.add);
            prop_assert_eq!(resolved.note, note);
        }
    }
}
