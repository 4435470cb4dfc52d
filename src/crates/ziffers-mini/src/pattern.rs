//! Stateful patterns
//!
//! A [`Pattern`] owns the parsed tree of its source text and the flat event
//! list of the current lap. Iterating with [`Pattern::next`] walks the list
//! round-robin; after `redo` laps the tree is evaluated again so cycles and
//! random degrees move on. A pattern is a mutable iterator and is not
//! synchronized: sharing one between threads needs an outer lock, which is
//! what [`crate::cache::PatternCache`] provides.

use crate::context::{EvalContext, EvalState};
use crate::error::ParseError;
use crate::node::{arpeggiate, evaluate_nodes, Node};
use crate::options::{KeySetting, Options, ScaleSetting};
use crate::parser::parse;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use ziffers_core::tonnetz::{self, chord_from_tonnetz, ChordKind, CycleKind, TonnetzSpace};
use ziffers_core::{rsystem, voice_lead, Chord, Event, Pitch, RuleTable, Scale, Value};

type Generator = Box<dyn Iterator<Item = i64> + Send>;

/// A list-level change, re-applied after every evaluation
#[derive(Debug, Clone)]
enum ListTransform {
    Retrograde,
    Rotate(i64),
    Every(usize),
    Shuffle,
    Deal(usize),
    From(usize),
    To(usize),
    Between(usize, usize),
    At(Vec<usize>),
    Lead,
    Arpeggio(Vec<Node>),
    TonnetzChords(ChordKind),
    Transform(String),
    TonnetzCycle(CycleKind, usize),
}

pub struct Pattern {
    source: String,
    options: Options,
    key: i64,
    scale: Arc<Scale>,
    nodes: Vec<Node>,
    error: Option<ParseError>,
    events: Vec<Event>,
    cursor: usize,
    state: EvalState,
    /// State as it was before the current lap was evaluated
    lap_state: EvalState,
    generator: Option<Generator>,
    transforms: Vec<ListTransform>,
}

impl Pattern {
    /// Parse and evaluate `source`. Text that does not parse gives an empty
    /// pattern; the error is kept in [`Pattern::error`].
    pub fn new(source: &str, options: Options) -> Self {
        let state = EvalState::new(options.seed.as_deref());
        let mut pattern = Pattern {
            source: source.to_string(),
            key: options.resolve_key(),
            scale: options.resolve_scale(),
            options,
            nodes: Vec::new(),
            error: None,
            events: Vec::new(),
            cursor: 0,
            lap_state: state.clone(),
            state,
            generator: None,
            transforms: Vec::new(),
        };
        pattern.reparse();
        pattern.evaluate();
        pattern
    }

    /// Pattern whose source text is rewritten from the next value of
    /// `generator` at every lap boundary. The digits of each value become
    /// the degrees, so 153 reads as `1 5 3`.
    pub fn from_generator<I>(generator: I, options: Options) -> Self
    where
        I: Iterator<Item = i64> + Send + 'static,
    {
        let mut generator: Generator = Box::new(generator);
        let source = generator.next().map(generator_text).unwrap_or_default();
        let mut pattern = Pattern::new(&source, options);
        pattern.generator = Some(generator);
        pattern
    }

    fn reparse(&mut self) {
        match parse(&self.source) {
            Ok(nodes) => {
                self.nodes = nodes;
                self.error = None;
            }
            Err(err) => {
                warn!(source = %self.source, error = %err, "parse failed, pattern is empty");
                self.nodes = Vec::new();
                self.error = Some(err);
            }
        }
    }

    fn context<'t>(&self) -> EvalContext<'t> {
        self.options.context_in(self.key, self.scale.clone())
    }

    /// Start a new lap from the current state
    fn evaluate(&mut self) {
        self.lap_state = self.state.clone();
        self.realize();
    }

    /// Evaluate the current lap again under changed options
    fn reevaluate(&mut self) {
        self.state = self.lap_state.clone();
        self.realize();
    }

    fn realize(&mut self) {
        let ctx = self.context();
        self.events = evaluate_nodes(&self.nodes, &ctx, &mut self.state);
        let transforms = std::mem::take(&mut self.transforms);
        for transform in &transforms {
            self.apply(transform);
        }
        self.transforms = transforms;
    }

    fn next_lap(&mut self) {
        if let Some(value) = self.generator.as_mut().and_then(|g| g.next()) {
            self.source = generator_text(value);
            self.reparse();
        }
        debug!(source = %self.source, "lap finished, evaluating again");
        self.evaluate();
    }

    /// Next event, round-robin. Crossing `len * redo` events starts a new
    /// lap; with `redo` 0 the first realization repeats forever.
    pub fn next(&mut self) -> Option<Event> {
        if self.events.is_empty() {
            return None;
        }
        let event = self.events[self.cursor % self.events.len()].clone();
        self.cursor += 1;
        if self.options.redo > 0 && self.cursor >= self.events.len() * self.options.redo {
            self.cursor = 0;
            self.next_lap();
        }
        Some(event)
    }

    /// Evaluate a fresh lap now and rewind the cursor
    pub fn update(&mut self) -> &mut Self {
        self.cursor = 0;
        self.next_lap();
        self
    }

    /// Event at `index`, wrapping around the list
    pub fn get(&self, index: usize) -> Option<&Event> {
        if self.events.is_empty() {
            return None;
        }
        self.events.get(index % self.events.len())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.events.iter().map(Event::duration).sum()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn collect<T, F>(&self, f: F) -> Vec<Value>
    where
        T: Into<Value>,
        F: Fn(&Pitch) -> T,
    {
        self.events.iter().map(|event| event.collect(&f)).collect()
    }

    /// Scale degrees
    pub fn pitches(&self) -> Vec<Value> {
        self.collect(|p| p.degree)
    }

    /// Integral MIDI notes
    pub fn notes(&self) -> Vec<Value> {
        self.collect(|p| p.note)
    }

    /// Exact note values, fractional in microtonal scales
    pub fn values(&self) -> Vec<Value> {
        self.collect(|p| p.value)
    }

    pub fn freqs(&self) -> Vec<Value> {
        self.collect(|p| p.freq)
    }

    pub fn bends(&self) -> Vec<Value> {
        self.collect(|p| p.bend.map(i64::from))
    }

    pub fn durations(&self) -> Vec<Value> {
        self.events.iter().map(|e| Value::from(e.duration())).collect()
    }

    pub fn octaves(&self) -> Vec<Value> {
        self.collect(|p| p.octave)
    }

    pub fn sounds(&self) -> Vec<Value> {
        self.collect(|p| p.sound.clone())
    }

    pub fn indices(&self) -> Vec<Value> {
        self.collect(|p| p.sound_index)
    }

    pub fn scale(&mut self, scale: impl Into<ScaleSetting>) -> &mut Self {
        let setting = scale.into();
        self.scale = Arc::new(setting.resolve());
        self.options.scale = setting;
        self.reevaluate();
        self
    }

    /// Equal division of the octave into `divisions` steps
    pub fn edo(&mut self, divisions: usize) -> &mut Self {
        let scale = Scale::edo(divisions);
        self.options.scale = ScaleSetting::Intervals(scale.intervals().to_vec());
        self.scale = Arc::new(scale);
        self.reevaluate();
        self
    }

    pub fn key(&mut self, key: impl Into<KeySetting>) -> &mut Self {
        let setting = key.into();
        self.key = setting.midi();
        self.options.key = setting;
        self.reevaluate();
        self
    }

    pub fn octave(&mut self, octave: i64) -> &mut Self {
        self.options.octave = octave;
        self.reevaluate();
        self
    }

    /// Invert every chord by `k`, replacing any earlier pattern-wide inversion
    pub fn invert(&mut self, k: i32) -> &mut Self {
        self.options.inversion = k;
        self.reevaluate();
        self
    }

    fn push(&mut self, transform: ListTransform) -> &mut Self {
        self.apply(&transform);
        self.transforms.push(transform);
        self
    }

    pub fn retrograde(&mut self) -> &mut Self {
        self.push(ListTransform::Retrograde)
    }

    /// Cyclic shift left by `n`; negative `n` shifts right
    pub fn rotate(&mut self, n: i64) -> &mut Self {
        self.push(ListTransform::Rotate(n))
    }

    /// Keep every `n`th event, starting with the first
    pub fn every(&mut self, n: usize) -> &mut Self {
        self.push(ListTransform::Every(n))
    }

    pub fn shuffle(&mut self) -> &mut Self {
        self.push(ListTransform::Shuffle)
    }

    /// Shuffle and keep `n` events
    pub fn deal(&mut self, n: usize) -> &mut Self {
        self.push(ListTransform::Deal(n))
    }

    /// Drop events before `index`
    pub fn from(&mut self, index: usize) -> &mut Self {
        self.push(ListTransform::From(index))
    }

    /// Drop events from `index` on
    pub fn to(&mut self, index: usize) -> &mut Self {
        self.push(ListTransform::To(index))
    }

    pub fn between(&mut self, start: usize, end: usize) -> &mut Self {
        self.push(ListTransform::Between(start, end))
    }

    /// Select events by index, wrapping around the list
    pub fn at(&mut self, indices: &[usize]) -> &mut Self {
        self.push(ListTransform::At(indices.to_vec()))
    }

    /// Re-voice each chord toward the one before it with minimal movement
    pub fn lead(&mut self) -> &mut Self {
        self.push(ListTransform::Lead)
    }

    /// Replace every chord with its members picked by the degrees of
    /// `indices`. Index text that does not parse leaves the pattern as is.
    pub fn arpeggio(&mut self, indices: &str) -> &mut Self {
        match parse(indices) {
            Ok(nodes) => self.push(ListTransform::Arpeggio(nodes)),
            Err(err) => {
                warn!(indices, error = %err, "arpeggio indices do not parse");
                self
            }
        }
    }

    /// Replace every event with the tonnetz chord of `kind` on its root
    pub fn tonnetz_chords(&mut self, kind: &str) -> &mut Self {
        match ChordKind::from_name(kind) {
            Some(kind) => self.push(ListTransform::TonnetzChords(kind)),
            None => {
                warn!(kind, "unknown tonnetz chord kind");
                self
            }
        }
    }

    /// Apply a chain of neo-Riemannian transformations such as `"plr"` to
    /// every chord
    pub fn transform(&mut self, names: &str) -> &mut Self {
        self.push(ListTransform::Transform(names.to_string()))
    }

    /// Replace the pattern with a chord cycle on the root of its first event
    pub fn tonnetz_cycle(&mut self, kind: &str, reps: usize) -> &mut Self {
        match CycleKind::from_name(kind) {
            Some(kind) => self.push(ListTransform::TonnetzCycle(kind, reps)),
            None => {
                warn!(kind, "unknown tonnetz cycle");
                self
            }
        }
    }

    /// New pattern from the source text rewritten `generations` times
    pub fn rules(&self, rules: &RuleTable, generations: usize) -> Pattern {
        Pattern::new(&rsystem(&self.source, rules, generations), self.options.clone())
    }

    fn apply(&mut self, transform: &ListTransform) {
        let len = self.events.len();
        let (key, scale) = (self.key, self.scale.clone());
        match transform {
            ListTransform::Retrograde => self.events.reverse(),
            ListTransform::Rotate(n) => {
                if len > 0 {
                    self.events.rotate_left(n.rem_euclid(len as i64) as usize);
                }
            }
            ListTransform::Every(n) => {
                if *n > 0 {
                    self.events = self.events.iter().step_by(*n).cloned().collect();
                }
            }
            ListTransform::Shuffle => self.events.shuffle(self.state.rng()),
            ListTransform::Deal(n) => {
                self.events.shuffle(self.state.rng());
                self.events.truncate(*n);
            }
            ListTransform::From(start) => {
                self.events.drain(..(*start).min(len));
            }
            ListTransform::To(end) => self.events.truncate(*end),
            ListTransform::Between(start, end) => {
                let end = (*end).min(len);
                let start = (*start).min(end);
                self.events = self.events[start..end].to_vec();
            }
            ListTransform::At(indices) => {
                if len > 0 {
                    self.events = indices.iter().map(|i| self.events[i % len].clone()).collect();
                }
            }
            ListTransform::Lead => self.lead_chords(),
            ListTransform::Arpeggio(nodes) => {
                let ctx = EvalContext {
                    octave: 0,
                    degrees: false,
                    inversion: 0,
                    ..self.context()
                };
                let mut state = EvalState::new(self.options.seed.as_deref());
                let picks = evaluate_nodes(nodes, &ctx, &mut state);
                self.events = std::mem::take(&mut self.events)
                    .into_iter()
                    .flat_map(|event| match event {
                        Event::Chord(chord) => picks.iter().map(|pick| arpeggiate(&chord, pick)).collect(),
                        other => vec![other],
                    })
                    .collect();
            }
            ListTransform::TonnetzChords(kind) => {
                let base = key.div_euclid(12) * 12;
                let space = TonnetzSpace::default();
                for event in self.events.iter_mut() {
                    let Some(root) = event.pitches().first() else {
                        continue;
                    };
                    let pcs = chord_from_tonnetz(root.note, *kind, space);
                    let notes: Vec<i64> = pcs.iter().map(|pc| pc + base).collect();
                    *event = chord_of(&notes, key, &scale, event.duration());
                }
            }
            ListTransform::Transform(names) => {
                let space = TonnetzSpace::default();
                for event in self.events.iter_mut() {
                    let Event::Chord(chord) = event else {
                        continue;
                    };
                    let notes = chord.notes();
                    let pcs: Vec<i64> = notes.iter().map(|n| n.rem_euclid(12)).collect();
                    let moved = tonnetz::transform(&pcs, names, space);
                    if moved == pcs {
                        continue;
                    }
                    let base = notes.first().map_or(key, |n| n.div_euclid(12) * 12);
                    let moved: Vec<i64> = moved.iter().map(|pc| pc + base).collect();
                    *event = chord_of(&moved, key, &scale, event.duration());
                }
            }
            ListTransform::TonnetzCycle(kind, reps) => {
                let Some(root) = self.events.iter().find_map(|e| e.pitches().first().map(|p| p.note)) else {
                    return;
                };
                let base = root.div_euclid(12) * 12;
                let duration = self.options.duration;
                self.events = tonnetz::cycle(root, *kind, TonnetzSpace::default(), *reps)
                    .iter()
                    .map(|pcs| {
                        let notes: Vec<i64> = pcs.iter().map(|pc| pc + base).collect();
                        chord_of(&notes, key, &scale, duration)
                    })
                    .collect();
            }
        }
    }

    fn lead_chords(&mut self) {
        let mut previous: Option<Vec<i64>> = None;
        for event in self.events.iter_mut() {
            let Event::Chord(chord) = event else {
                continue;
            };
            if let Some(prev) = &previous {
                let notes = chord.notes();
                let voiced: Vec<Pitch> = voice_lead(prev, &notes)
                    .into_iter()
                    .map(|(index, note)| {
                        let mut pitch = chord.pitches[index].clone();
                        pitch.shift_octave((note - notes[index]).div_euclid(12));
                        pitch
                    })
                    .collect();
                chord.pitches = voiced;
            }
            previous = Some(chord.notes());
        }
    }
}

fn chord_of(notes: &[i64], key: i64, scale: &Arc<Scale>, duration: f64) -> Event {
    Event::Chord(Chord::new(
        notes
            .iter()
            .map(|note| Pitch::from_note(*note, key, scale.clone()).with_duration(duration))
            .collect(),
    ))
}

fn generator_text(value: i64) -> String {
    let digits: Vec<String> = value.unsigned_abs().to_string().chars().map(String::from).collect();
    let text = digits.join(" ");
    if value < 0 {
        format!("-{}", text)
    } else {
        text
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("options", &self.options)
            .field("events", &self.events.len())
            .field("cursor", &self.cursor)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
