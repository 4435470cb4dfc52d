//! Ziffers notation parser, pattern engine and pattern cache
//!
//! Ziffers writes melodies as scale degrees: `0` is the root of the key, `024`
//! a triad, `q` switches to quarter notes. This crate parses that notation
//! into a node tree, evaluates the tree into pitches, chords and rests, and
//! wraps the result in a stateful [`Pattern`] that can be iterated and
//! transformed.
//!
//! # Examples
//!
//! ```
//! use ziffers_mini::{Options, Pattern};
//!
//! let mut pattern = Pattern::new("q 0 2 4 [5 6]", Options::default());
//! assert_eq!(pattern.len(), 5);
//!
//! let first = pattern.next().unwrap();
//! assert_eq!(first.pitches()[0].note, 60);
//! ```
//!
//! # Notation
//!
//! - Degrees: `0 1 2`, chords `024`, multi-digit degrees `{10}`
//! - Durations: `w h q e s`, dotted `q.`, prefixed `e3`, decimal `0.5`
//! - Octaves: `^0`, `_0`, or standalone `^` for all that follow
//! - Groups: subdivision `[1 2]`, list `(1 2)`, cycle `<1 2>`
//! - List arithmetic: `(0 2)+(1 3)`
//! - Random degrees: `?`, `(1,5)`
//! - Roman numerals `i v7 vi^min`, note names `C Eb`, chords `Cmaj D7`
//! - Inversion `024%1`, arpeggio `024@(0 2 1)`, repeat `1!3`
//! - Samples: `bd hh:2`, `0@bd`, `0:<1 2>`
//!
//! # Main Types
//!
//! - [`parse`]: notation text to [`Node`] tree
//! - [`Pattern`]: evaluated, iterable, transformable pattern
//! - [`PatternCache`]: shared live patterns keyed by text and [`Options`]

pub mod cache;
pub mod context;
pub mod error;
pub mod lexer;
pub mod node;
pub mod options;
pub mod parser;
pub mod pattern;
pub mod span;


pub use cache::{CacheConfig, Clock, PatternCache, SharedPattern, SystemClock};
pub use context::{ContextDelta, EvalContext, EvalState};
pub use error::{ParseError, Result};
pub use lexer::{Lexer, Token};
pub use node::{evaluate_nodes, ListOp, Node, NodeKind};
pub use options::{KeySetting, Options, ScaleSetting};
pub use parser::{parse, Parser};
pub use pattern::Pattern;
pub use span::Span;
