//! Evaluation context and state
//!
//! [`EvalContext`] is the cascading record passed down the node tree. It is
//! cloned into every container, and mutator nodes return a [`ContextDelta`]
//! that the container folds into the context of later siblings only.
//!
//! [`EvalState`] is everything that must survive between evaluations: the
//! random generator and the position of every cycle.

use crate::node::Node;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use ziffers_core::{seeded_rng, Scale};

#[derive(Debug, Clone)]
pub struct EvalContext<'t> {
    pub key: i64,
    pub scale: Arc<Scale>,
    pub octave: i64,
    /// Duration of events without an explicit one
    pub duration: f64,
    /// Numeric degrees count from 1 instead of 0
    pub degrees: bool,
    /// Inversion added to every chord's own inversion
    pub inversion: i32,
    /// Inside a subdivision, whose parent decides the time budget
    pub subdivided: bool,
    /// Sample name source waiting for the next pitch
    pub(crate) sound: Option<&'t Node>,
    /// Sample index source waiting for the next pitch
    pub(crate) index: Option<&'t Node>,
}

impl<'t> EvalContext<'t> {
    pub fn new(key: i64, scale: Arc<Scale>) -> Self {
        EvalContext {
            key,
            scale,
            octave: 0,
            duration: 0.25,
            degrees: false,
            inversion: 0,
            subdivided: false,
            sound: None,
            index: None,
        }
    }

    pub fn apply(&mut self, delta: ContextDelta) {
        match delta {
            ContextDelta::Octave(change) => self.octave += change,
            ContextDelta::Duration(duration) => self.duration = duration,
        }
    }

    pub(crate) fn with_sound(&self, source: &'t Node) -> Self {
        EvalContext {
            sound: Some(source),
            ..self.clone()
        }
    }

    pub(crate) fn with_index(&self, source: &'t Node) -> Self {
        EvalContext {
            index: Some(source),
            ..self.clone()
        }
    }
}

/// Change a mutator node makes to the context of its later siblings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextDelta {
    Octave(i64),
    Duration(f64),
}

#[derive(Debug, Clone)]
pub struct EvalState {
    rng: StdRng,
    cycles: HashMap<usize, usize>,
}

impl EvalState {
    pub fn new(seed: Option<&str>) -> Self {
        EvalState {
            rng: seeded_rng(seed),
            cycles: HashMap::new(),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Uniform draw from `[min, max]`, in either order
    pub fn random_between(&mut self, min: i64, max: i64) -> i64 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(low..=high)
    }

    /// Current position of the cycle at `key`, advancing it for next time
    pub fn advance_cycle(&mut self, key: usize, len: usize) -> usize {
        let position = self.cycles.entry(key).or_insert(0);
        let current = *position % len.max(1);
        *position = current + 1;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_delta() {
        let mut ctx = EvalContext::new(60, Arc::new(Scale::major()));
        ctx.apply(ContextDelta::Octave(1));
        ctx.apply(ContextDelta::Octave(1));
        ctx.apply(ContextDelta::Duration(0.125));
        assert_eq!(ctx.octave, 2);
        assert_eq!(ctx.duration, 0.125);
    }

    #[test]
    fn test_cycle_positions() {
        let mut state = EvalState::new(Some("seed"));
        let picks: Vec<usize> = (0..5).map(|_| state.advance_cycle(3, 3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
        assert_eq!(state.advance_cycle(9, 2), 0);
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let mut a = EvalState::new(Some("x"));
        let mut b = EvalState::new(Some("x"));
        for _ in 0..10 {
            let draw = a.random_between(7, 0);
            assert!((0..=7).contains(&draw));
            assert_eq!(draw, b.random_between(0, 7));
        }
    }
}
