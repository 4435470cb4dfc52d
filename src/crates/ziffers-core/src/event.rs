use crate::scale::{midi_to_freq, midi_to_pitch_class, resolve_pitch, Scale};
use crate::Value;
use serde::Serialize;
use std::sync::Arc;

/// A resolved scale degree
///
/// `degree` and `octave` are kept as written; carrying an out of range degree
/// into the octave happens only when the note is resolved. Every constructor
/// and `with_*` method re-resolves, so `note`, `value`, `freq` and `bend`
/// always agree with the degree data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pitch {
    pub degree: i64,
    /// Chromatic alteration in semitones
    pub add: f64,
    pub octave: i64,
    /// Integral MIDI note
    pub note: i64,
    /// Exact note value, fractional for microtonal scales
    pub value: f64,
    pub freq: f64,
    /// 14-bit pitch bend for fractional values
    pub bend: Option<u16>,
    pub duration: f64,
    /// Root note of the scale
    pub key: i64,
    #[serde(skip)]
    pub scale: Arc<Scale>,
    pub sound: Option<String>,
    pub sound_index: Option<i64>,
}

impl Pitch {
    pub fn new(degree: i64, key: i64, scale: Arc<Scale>) -> Self {
        Pitch {
            degree,
            add: 0.0,
            octave: 0,
            note: 0,
            value: 0.0,
            freq: 0.0,
            bend: None,
            duration: 0.25,
            key,
            scale,
            sound: None,
            sound_index: None,
        }
        .resolved()
    }

    /// Pitch with a chromatic alteration and octave offset
    pub fn altered(degree: i64, add: f64, octave: i64, key: i64, scale: Arc<Scale>) -> Self {
        Pitch {
            add,
            octave,
            ..Pitch::new(degree, key, scale)
        }
        .resolved()
    }

    /// Pitch spelling a MIDI note relative to a key and scale
    pub fn from_note(note: i64, key: i64, scale: Arc<Scale>) -> Self {
        let pc = midi_to_pitch_class(note, key, &scale);
        Pitch::altered(pc.degree, pc.add, pc.octave, key, scale)
    }

    fn resolved(mut self) -> Self {
        let resolved = resolve_pitch(self.key, self.degree, self.scale.intervals(), self.octave, self.add);
        self.note = resolved.note;
        self.value = resolved.value;
        self.bend = resolved.bend;
        self.freq = midi_to_freq(resolved.value);
        self
    }

    pub fn with_degree(self, degree: i64) -> Self {
        Pitch { degree, ..self }.resolved()
    }

    pub fn with_octave(self, octave: i64) -> Self {
        Pitch { octave, ..self }.resolved()
    }

    pub fn with_add(self, add: f64) -> Self {
        Pitch { add, ..self }.resolved()
    }

    pub fn with_key(self, key: i64) -> Self {
        Pitch { key, ..self }.resolved()
    }

    pub fn with_duration(self, duration: f64) -> Self {
        Pitch { duration, ..self }
    }

    pub fn shift_octave(&mut self, octaves: i64) {
        *self = self.clone().with_octave(self.octave + octaves);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chord {
    pub pitches: Vec<Pitch>,
}

impl Chord {
    pub fn new(pitches: Vec<Pitch>) -> Self {
        Chord { pitches }
    }

    /// Longest member duration
    pub fn duration(&self) -> f64 {
        self.pitches.iter().map(|p| p.duration).fold(0.0, f64::max)
    }

    pub fn notes(&self) -> Vec<i64> {
        self.pitches.iter().map(|p| p.note).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rest {
    pub duration: f64,
}

/// The playable result of evaluating notation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Pitch(Pitch),
    Chord(Chord),
    Rest(Rest),
}

impl Event {
    pub fn duration(&self) -> f64 {
        match self {
            Event::Pitch(p) => p.duration,
            Event::Chord(c) => c.duration(),
            Event::Rest(r) => r.duration,
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        match self {
            Event::Pitch(p) => p.duration = duration,
            Event::Chord(c) => c.pitches.iter_mut().for_each(|p| p.duration = duration),
            Event::Rest(r) => r.duration = duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Event::Rest(_))
    }

    /// Every pitch in the event, empty for rests
    pub fn pitches(&self) -> &[Pitch] {
        match self {
            Event::Pitch(p) => std::slice::from_ref(p),
            Event::Chord(c) => &c.pitches,
            Event::Rest(_) => &[],
        }
    }

    pub fn pitches_mut(&mut self) -> &mut [Pitch] {
        match self {
            Event::Pitch(p) => std::slice::from_mut(p),
            Event::Chord(c) => &mut c.pitches,
            Event::Rest(_) => &mut [],
        }
    }

    /// Collect one value per pitch: a scalar for pitches, a list for chords
    /// and silence for rests
    pub fn collect<T, F>(&self, f: F) -> Value
    where
        T: Into<Value>,
        F: Fn(&Pitch) -> T,
    {
        match self {
            Event::Pitch(p) => f(p).into(),
            Event::Chord(c) => Value::Chord(c.pitches.iter().map(|p| f(p).into()).collect()),
            Event::Rest(_) => Value::Silence,
        }
    }
}

impl From<Pitch> for Event {
    fn from(pitch: Pitch) -> Self {
        Event::Pitch(pitch)
    }
}

impl From<Chord> for Event {
    fn from(chord: Chord) -> Self {
        Event::Chord(chord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn major() -> Arc<Scale> {
        Arc::new(Scale::major())
    }

    #[test]
    fn test_pitch_resolution() {
        let pitch = Pitch::new(4, 60, major());
        assert_eq!(pitch.note, 67);
        assert!((pitch.freq - 391.99543598174927).abs() < 1e-9);
        assert_eq!(pitch.clone().with_octave(1).note, 79);
        assert_eq!(pitch.with_degree(7).note, 72);
    }

    #[test]
    fn test_from_note_round_trip() {
        for note in 48..72 {
            assert_eq!(Pitch::from_note(note, 62, major()).note, note);
        }
        let d7 = [62, 66, 69, 72].map(|n| Pitch::from_note(n, 62, major()).degree);
        assert_eq!(d7, [0, 2, 4, 5]);
    }

    #[test]
    fn test_chord_duration_is_longest_member() {
        let chord = Chord::new(vec![
            Pitch::new(0, 60, major()).with_duration(0.25),
            Pitch::new(2, 60, major()).with_duration(0.5),
        ]);
        assert_eq!(chord.duration(), 0.5);

        let mut event = Event::from(chord);
        event.set_duration(0.125);
        assert_eq!(event.duration(), 0.125);
    }

    #[test]
    fn test_collect() {
        let chord = Event::from(Chord::new(vec![Pitch::new(0, 60, major()), Pitch::new(2, 60, major())]));
        assert_eq!(chord.collect(|p| p.note), Value::from(vec![60, 64]));
        assert!(Event::Rest(Rest { duration: 0.25 }).collect(|p| p.note).is_silence());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(Event::Rest(Rest { duration: 0.5 })).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Rest", "duration": 0.5}));

        let pitch = serde_json::to_value(Event::from(Pitch::new(0, 60, major()))).unwrap();
        assert_eq!(pitch["type"], "Pitch");
        assert_eq!(pitch["note"], 60);
        assert!(pitch.get("scale").is_none());
    }
}
