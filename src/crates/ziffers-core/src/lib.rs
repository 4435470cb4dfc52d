//! Core music theory types for Ziffers notation
//!
//! This crate holds everything the notation engine needs that does not depend on
//! the grammar: scale tables and the degree resolver, tuning-file parsing, named
//! chords, the tonnetz chord algebra, rewrite rules, integer sequences and the
//! resolved [`Event`] values that evaluation produces.
//!
//! # Examples
//!
//! ```
//! use ziffers_core::scale::{resolve_pitch, MAJOR};
//!
//! // Degree 1 of C major is D
//! let pitch = resolve_pitch(60, 1, &MAJOR, 0, 0.0);
//! assert_eq!(pitch.note, 62);
//! assert_eq!(pitch.bend, None);
//! ```
//!
//! # Main Components
//!
//! - **Scale**: interval tables and the degree to pitch resolver
//! - **Event**: resolved pitches, chords and rests
//! - **Value**: collector output (numbers, names, nested lists)
//! - **tonnetz**: chord builders and neo-Riemannian transformations
//! - **rules**: regex driven L-system style string rewriting

pub mod chords;
pub mod error;
pub mod event;
pub mod random;
pub mod rules;
pub mod scale;
pub mod sequences;
pub mod tonnetz;
pub mod tuning;
pub mod value;

pub use chords::{invert, normal_form, prime_form, voice_lead};
pub use error::TuningError;
pub use event::{Chord, Event, Pitch, Rest};
pub use random::seeded_rng;
pub use rules::{rsystem, RuleArg, RuleTable};
pub use scale::{midi_to_freq, note_name_to_midi, resolve_pitch, ResolvedPitch, Scale};
pub use tonnetz::{ChordKind, TonnetzSpace, Transformation};
pub use value::Value;
