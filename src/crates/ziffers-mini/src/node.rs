//! Parsed notation tree and its evaluation into events
//!
//! Evaluation happens in two phases. [`Node::realize`] walks the tree and
//! produces [`Slot`]s: finished events, or groups whose members still have to
//! share a time budget. Subdivisions only know their budget once their parent
//! has been realized, so durations inside groups are assigned afterwards by
//! [`resolve_slots`].

use crate::context::{ContextDelta, EvalContext, EvalState};
use crate::span::Span;
use serde::{Deserialize, Serialize};
use ziffers_core::chords::{chord_intervals, invert};
use ziffers_core::{note_name_to_midi, Chord, Event, Pitch, Rest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    pub span: Span,
}

/// Arithmetic between the degrees of two lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ListOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(ListOp::Add),
            "-" => Some(ListOp::Subtract),
            "*" => Some(ListOp::Multiply),
            "/" => Some(ListOp::Divide),
            "%" => Some(ListOp::Modulo),
            _ => None,
        }
    }

    /// Division and modulo by zero give 0
    pub fn apply(&self, left: i64, right: i64) -> i64 {
        match self {
            ListOp::Add => left + right,
            ListOp::Subtract => left - right,
            ListOp::Multiply => left * right,
            ListOp::Divide if right == 0 => 0,
            ListOp::Divide => left.div_euclid(right),
            ListOp::Modulo if right == 0 || left == 0 => 0,
            ListOp::Modulo => left.rem_euclid(right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Pitch {
        degree: i64,
        add: f64,
        octave: i64,
        duration: Option<f64>,
    },
    Chord {
        pitches: Vec<Node>,
        inversion: i32,
    },
    Rest {
        duration: Option<f64>,
    },
    /// Plain sequence, spliced into its parent
    List {
        items: Vec<Node>,
    },
    ListOperation {
        op: ListOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Repeat {
        item: Box<Node>,
        times: usize,
    },
    /// Items share the duration of one event
    Subdivision {
        items: Vec<Node>,
    },
    /// One item per evaluation, in turn
    Cycle {
        items: Vec<Node>,
    },
    OctaveChange {
        change: i64,
    },
    DurationChange {
        duration: f64,
    },
    /// Degree drawn from `min..=max`; `max` defaults to the scale length
    RandomPitch {
        min: i64,
        max: Option<i64>,
        octave: i64,
        duration: Option<f64>,
    },
    /// Chord on a roman numeral scale degree, counted from 1
    Roman {
        numeral: i64,
        chord: Option<String>,
        inversion: i32,
        octave: i64,
        duration: Option<f64>,
    },
    NamedChord {
        root: String,
        chord: String,
        inversion: i32,
        octave: i64,
        duration: Option<f64>,
    },
    Note {
        name: String,
        octave: i64,
        duration: Option<f64>,
    },
    Sound {
        name: String,
        index: Option<i64>,
        duration: Option<f64>,
    },
    /// Item played with the sample named by `sound`
    SoundEvent {
        item: Box<Node>,
        sound: Box<Node>,
    },
    SoundIndex {
        item: Box<Node>,
        index: Box<Node>,
    },
    /// Chord members picked by the degrees of `indices`
    Arpeggio {
        chord: Box<Node>,
        indices: Vec<Node>,
    },
}

/// A realized event, or events waiting for their share of a budget
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Event(Event),
    Group { budget: Option<f64>, slots: Vec<Slot> },
}

#[derive(Debug, Clone)]
pub(crate) enum Realized {
    Slots(Vec<Slot>),
    Delta(ContextDelta),
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    /// Evaluate this node alone. Mutators produce no events.
    pub fn evaluate<'t>(&'t self, ctx: &EvalContext<'t>, state: &mut EvalState) -> Vec<Event> {
        let ctx = EvalContext {
            subdivided: false,
            ..ctx.clone()
        };
        match self.realize(&ctx, state) {
            Realized::Slots(slots) => resolve_slots(slots, ctx.duration),
            Realized::Delta(_) => Vec::new(),
        }
    }

    pub(crate) fn realize<'t>(&'t self, ctx: &EvalContext<'t>, state: &mut EvalState) -> Realized {
        let event = match &self.kind {
            NodeKind::Pitch {
                degree,
                add,
                octave,
                duration,
            } => {
                let degree = if ctx.degrees && *degree > 0 { degree - 1 } else { *degree };
                Event::Pitch(scale_pitch(ctx, degree, *add, *octave, *duration))
            }
            NodeKind::Chord { pitches, inversion } => {
                let bare = EvalContext {
                    sound: None,
                    index: None,
                    ..ctx.clone()
                };
                let members = pitches
                    .iter()
                    .flat_map(|node| node.evaluate(&bare, state))
                    .flat_map(|event| event.pitches().to_vec())
                    .collect();
                Event::Chord(inverted(members, inversion.saturating_add(ctx.inversion)))
            }
            NodeKind::Rest { duration } => Event::Rest(Rest {
                duration: duration.unwrap_or(ctx.duration),
            }),
            NodeKind::RandomPitch {
                min,
                max,
                octave,
                duration,
            } => {
                let max = max.unwrap_or(ctx.scale.len() as i64);
                let degree = state.random_between(*min, max);
                Event::Pitch(scale_pitch(ctx, degree, 0.0, *octave, *duration))
            }
            NodeKind::Roman {
                numeral,
                chord,
                inversion,
                octave,
                duration,
            } => {
                let root = numeral - 1;
                let members = match chord {
                    None => [0, 2, 4]
                        .iter()
                        .map(|step| scale_pitch(ctx, root + step, 0.0, *octave, *duration))
                        .collect(),
                    Some(name) => {
                        let root_note = scale_pitch(ctx, root, 0.0, *octave, *duration).note;
                        chord_intervals(name)
                            .iter()
                            .map(|interval| {
                                Pitch::from_note(root_note + interval, ctx.key, ctx.scale.clone())
                                    .with_duration(duration.unwrap_or(ctx.duration))
                            })
                            .collect()
                    }
                };
                Event::Chord(inverted(members, inversion.saturating_add(ctx.inversion)))
            }
            NodeKind::NamedChord {
                root,
                chord,
                inversion,
                octave,
                duration,
            } => {
                let root_note = note_name_to_midi(root).unwrap_or(60) + 12 * (ctx.octave + octave);
                let members = chord_intervals(chord)
                    .iter()
                    .map(|interval| {
                        Pitch::from_note(root_note + interval, ctx.key, ctx.scale.clone())
                            .with_duration(duration.unwrap_or(ctx.duration))
                    })
                    .collect();
                Event::Chord(inverted(members, inversion.saturating_add(ctx.inversion)))
            }
            NodeKind::Note {
                name,
                octave,
                duration,
            } => {
                let note = note_name_to_midi(name).unwrap_or(60) + 12 * (ctx.octave + octave);
                Event::Pitch(
                    Pitch::from_note(note, ctx.key, ctx.scale.clone())
                        .with_duration(duration.unwrap_or(ctx.duration)),
                )
            }
            NodeKind::Sound {
                name,
                index,
                duration,
            } => {
                let mut pitch = scale_pitch(ctx, 0, 0.0, 0, *duration);
                pitch.sound = Some(name.clone());
                pitch.sound_index = *index;
                let mut event = Event::Pitch(pitch);
                if let Some(source) = ctx.index {
                    if let Some(index) = draw_index(source, state) {
                        set_index(&mut event, index);
                    }
                }
                return Realized::Slots(vec![Slot::Event(event)]);
            }
            NodeKind::List { items } => return Realized::Slots(realize_sequence(items, ctx, state)),
            NodeKind::Subdivision { items } => {
                let inner = EvalContext {
                    subdivided: true,
                    ..ctx.clone()
                };
                let slots = realize_sequence(items, &inner, state);
                let budget = (!ctx.subdivided).then_some(ctx.duration);
                return Realized::Slots(vec![Slot::Group { budget, slots }]);
            }
            NodeKind::Cycle { items } => {
                if items.is_empty() {
                    return Realized::Slots(Vec::new());
                }
                let pick = state.advance_cycle(self.span.start, items.len());
                return items[pick].realize(ctx, state);
            }
            NodeKind::Repeat { item, times } => return repeat(item, *times, ctx, state),
            NodeKind::OctaveChange { change } => return Realized::Delta(ContextDelta::Octave(*change)),
            NodeKind::DurationChange { duration } => {
                return Realized::Delta(ContextDelta::Duration(*duration))
            }
            NodeKind::SoundEvent { item, sound } => return item.realize(&ctx.with_sound(sound), state),
            NodeKind::SoundIndex { item, index } => return item.realize(&ctx.with_index(index), state),
            NodeKind::ListOperation { op, left, right } => {
                let left = left.evaluate(ctx, state);
                let right = right.evaluate(ctx, state);
                let slots = right
                    .iter()
                    .flat_map(|r| left.iter().map(move |l| combine(*op, l, r)))
                    .map(Slot::Event)
                    .collect();
                return Realized::Slots(slots);
            }
            NodeKind::Arpeggio { chord, indices } => {
                let chords = chord.evaluate(ctx, state);
                let index_ctx = EvalContext {
                    octave: 0,
                    degrees: false,
                    inversion: 0,
                    subdivided: false,
                    sound: None,
                    index: None,
                    ..ctx.clone()
                };
                let picks = evaluate_nodes(indices, &index_ctx, state);
                let slots = chords
                    .into_iter()
                    .flat_map(|event| match event {
                        Event::Chord(chord) => picks.iter().map(|pick| arpeggiate(&chord, pick)).collect(),
                        other => vec![other],
                    })
                    .map(Slot::Event)
                    .collect();
                return Realized::Slots(slots);
            }
        };

        let mut event = event;
        attach(&mut event, ctx, state);
        Realized::Slots(vec![Slot::Event(event)])
    }
}

fn scale_pitch(ctx: &EvalContext, degree: i64, add: f64, octave: i64, duration: Option<f64>) -> Pitch {
    Pitch::altered(degree, add, ctx.octave + octave, ctx.key, ctx.scale.clone())
        .with_duration(duration.unwrap_or(ctx.duration))
}

fn inverted(pitches: Vec<Pitch>, inversion: i32) -> Chord {
    Chord::new(invert(pitches, inversion, |pitch, octaves| pitch.shift_octave(octaves)))
}

fn repeat<'t>(item: &'t Node, times: usize, ctx: &EvalContext<'t>, state: &mut EvalState) -> Realized {
    let mut slots = Vec::new();
    for _ in 0..times {
        match item.realize(ctx, state) {
            Realized::Slots(more) => slots.extend(more),
            Realized::Delta(ContextDelta::Octave(change)) => {
                return Realized::Delta(ContextDelta::Octave(change * times as i64))
            }
            Realized::Delta(delta) => return Realized::Delta(delta),
        }
    }
    Realized::Slots(slots)
}

/// Realize siblings in order, folding mutators into the context of later ones
pub(crate) fn realize_sequence<'t>(nodes: &'t [Node], ctx: &EvalContext<'t>, state: &mut EvalState) -> Vec<Slot> {
    let mut local = ctx.clone();
    let mut slots = Vec::new();
    for node in nodes {
        match node.realize(&local, state) {
            Realized::Slots(more) => slots.extend(more),
            Realized::Delta(delta) => local.apply(delta),
        }
    }
    slots
}

/// Evaluate a sequence of nodes into events with final durations
pub fn evaluate_nodes<'t>(nodes: &'t [Node], ctx: &EvalContext<'t>, state: &mut EvalState) -> Vec<Event> {
    let ctx = EvalContext {
        subdivided: false,
        ..ctx.clone()
    };
    resolve_slots(realize_sequence(nodes, &ctx, state), ctx.duration)
}

/// Flatten slots, dividing each group's budget equally among its members
pub(crate) fn resolve_slots(slots: Vec<Slot>, fallback: f64) -> Vec<Event> {
    let mut events = Vec::new();
    for slot in slots {
        match slot {
            Slot::Event(event) => events.push(event),
            Slot::Group { budget, slots } => divide(slots, budget.unwrap_or(fallback), &mut events),
        }
    }
    events
}

fn divide(slots: Vec<Slot>, budget: f64, out: &mut Vec<Event>) {
    if slots.is_empty() {
        return;
    }
    let share = budget / slots.len() as f64;
    for slot in slots {
        match slot {
            Slot::Event(mut event) => {
                event.set_duration(share);
                out.push(event);
            }
            Slot::Group { slots, .. } => divide(slots, share, out),
        }
    }
}

fn attach(event: &mut Event, ctx: &EvalContext, state: &mut EvalState) {
    if let Some(source) = ctx.sound {
        if let Some((name, index)) = draw_sound(source, state) {
            for pitch in event.pitches_mut() {
                pitch.sound = Some(name.clone());
                if index.is_some() {
                    pitch.sound_index = index;
                }
            }
        }
    }
    if let Some(source) = ctx.index {
        if let Some(index) = draw_index(source, state) {
            set_index(event, index);
        }
    }
}

fn set_index(event: &mut Event, index: i64) {
    for pitch in event.pitches_mut() {
        pitch.sound_index = Some(index);
    }
}

fn draw_sound(node: &Node, state: &mut EvalState) -> Option<(String, Option<i64>)> {
    match &node.kind {
        NodeKind::Sound { name, index, .. } => Some((name.clone(), *index)),
        NodeKind::Cycle { items } if !items.is_empty() => {
            let pick = state.advance_cycle(node.span.start, items.len());
            draw_sound(&items[pick], state)
        }
        _ => None,
    }
}

fn draw_index(node: &Node, state: &mut EvalState) -> Option<i64> {
    match &node.kind {
        NodeKind::Pitch { degree, .. } => Some(*degree),
        NodeKind::Cycle { items } if !items.is_empty() => {
            let pick = state.advance_cycle(node.span.start, items.len());
            draw_index(&items[pick], state)
        }
        _ => None,
    }
}

/// Apply `op` between the degrees of `left` and `right`.
///
/// The result takes its duration from `right` and everything else from
/// `left`. Chords combine member by member, the shorter one repeating.
fn combine(op: ListOp, left: &Event, right: &Event) -> Event {
    let apply = |pitch: &Pitch, degree: i64| {
        pitch
            .clone()
            .with_degree(op.apply(pitch.degree, degree))
            .with_duration(right.duration())
    };
    match (left, right) {
        (Event::Rest(_), _) | (_, Event::Rest(_)) => Event::Rest(Rest {
            duration: right.duration(),
        }),
        (Event::Pitch(l), Event::Pitch(r)) => Event::Pitch(apply(l, r.degree)),
        (Event::Chord(l), Event::Pitch(r)) => {
            Event::Chord(Chord::new(l.pitches.iter().map(|p| apply(p, r.degree)).collect()))
        }
        (Event::Pitch(l), Event::Chord(r)) => {
            Event::Chord(Chord::new(r.pitches.iter().map(|q| apply(l, q.degree)).collect()))
        }
        (Event::Chord(l), Event::Chord(r)) => {
            let len = l.pitches.len().max(r.pitches.len());
            let pitches = (0..len)
                .filter_map(|i| {
                    let p = l.pitches.get(i % l.pitches.len().max(1))?;
                    let q = r.pitches.get(i % r.pitches.len().max(1))?;
                    Some(apply(p, q.degree))
                })
                .collect();
            Event::Chord(Chord::new(pitches))
        }
    }
}

/// Pick members of `chord` by the degrees of `pick`.
///
/// Degrees past the chord size wrap into higher octaves, and the pick's own
/// octave shifts the member. The result keeps the pick's duration.
pub(crate) fn arpeggiate(chord: &Chord, pick: &Event) -> Event {
    let len = chord.pitches.len() as i64;
    let member = |index: &Pitch| -> Option<Pitch> {
        if len == 0 {
            return None;
        }
        let mut pitch = chord.pitches[index.degree.rem_euclid(len) as usize].clone();
        pitch.shift_octave(index.octave + index.degree.div_euclid(len));
        Some(pitch.with_duration(index.duration))
    };
    match pick {
        Event::Pitch(index) => match member(index) {
            Some(pitch) => Event::Pitch(pitch),
            None => Event::Rest(Rest {
                duration: index.duration,
            }),
        },
        Event::Chord(indices) => Event::Chord(Chord::new(indices.pitches.iter().filter_map(member).collect())),
        Event::Rest(rest) => Event::Rest(*rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use ziffers_core::Scale;

    fn context<'t>() -> EvalContext<'t> {
        EvalContext::new(60, Arc::new(Scale::major()))
    }

    fn pitch(degree: i64, start: usize) -> Node {
        Node::new(
            NodeKind::Pitch {
                degree,
                add: 0.0,
                octave: 0,
                duration: None,
            },
            Span::new(start, start + 1),
        )
    }

    fn notes(events: &[Event]) -> Vec<Vec<i64>> {
        events
            .iter()
            .map(|e| e.pitches().iter().map(|p| p.note).collect())
            .collect()
    }

    #[test]
    fn test_list_op_safe_division() {
        assert_eq!(ListOp::Divide.apply(7, 2), 3);
        assert_eq!(ListOp::Divide.apply(7, 0), 0);
        assert_eq!(ListOp::Modulo.apply(7, 0), 0);
        assert_eq!(ListOp::Modulo.apply(-1, 7), 6);
        assert_eq!(ListOp::from_symbol("*"), Some(ListOp::Multiply));
    }

    #[test]
    fn test_subdivision_divides_budget() {
        let tree = vec![Node::new(
            NodeKind::Subdivision {
                items: vec![
                    pitch(1, 1),
                    Node::new(
                        NodeKind::Subdivision {
                            items: vec![pitch(2, 4), pitch(3, 6)],
                        },
                        Span::new(3, 8),
                    ),
                ],
            },
            Span::new(0, 9),
        )];
        let ctx = context();
        let events = evaluate_nodes(&tree, &ctx, &mut EvalState::new(None));
        let durations: Vec<f64> = events.iter().map(Event::duration).collect();
        assert_eq!(durations, vec![0.125, 0.0625, 0.0625]);
    }

    #[test]
    fn test_octave_change_affects_later_siblings() {
        let tree = vec![
            pitch(0, 0),
            Node::new(NodeKind::OctaveChange { change: 1 }, Span::new(2, 3)),
            pitch(0, 4),
        ];
        let ctx = context();
        let events = evaluate_nodes(&tree, &ctx, &mut EvalState::new(None));
        assert_eq!(notes(&events), vec![vec![60], vec![72]]);
    }

    #[test]
    fn test_cycle_advances_per_evaluation() {
        let tree = vec![Node::new(
            NodeKind::Cycle {
                items: vec![pitch(0, 1), pitch(4, 3)],
            },
            Span::new(0, 5),
        )];
        let ctx = context();
        let mut state = EvalState::new(None);
        let picks: Vec<Vec<Vec<i64>>> = (0..3).map(|_| notes(&evaluate_nodes(&tree, &ctx, &mut state))).collect();
        assert_eq!(picks, vec![vec![vec![60]], vec![vec![67]], vec![vec![60]]]);
    }

    #[test]
    fn test_arpeggiate_wraps_octaves() {
        let major = Arc::new(Scale::major());
        let chord = Chord::new([0, 2, 4].iter().map(|d| Pitch::new(*d, 60, major.clone())).collect());
        let pick = Event::Pitch(Pitch::new(4, 60, major.clone()));
        assert_eq!(arpeggiate(&chord, &pick).pitches()[0].note, 76);
    }
}
