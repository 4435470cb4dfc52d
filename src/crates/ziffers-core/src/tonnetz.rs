//! Chord algebra over a generalized tonnetz
//!
//! A tonnetz space is a triple of step sizes `(a, b, c)` whose sum is the
//! modulus. The standard 12-tone lattice is `(3, 4, 5)`: minor third, major
//! third, perfect fourth. Chords are built as fixed combinations of `a` and `b`
//! above a root and every transformation maps one chord type at root `r` to
//! another type at `r + offset`, which makes each of them an involution.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TonnetzSpace {
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

impl TonnetzSpace {
    pub fn new(a: i64, b: i64, c: i64) -> Self {
        TonnetzSpace { a, b, c }
    }

    pub fn modulus(&self) -> i64 {
        self.a + self.b + self.c
    }
}

impl Default for TonnetzSpace {
    fn default() -> Self {
        TonnetzSpace::new(3, 4, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordKind {
    Major,
    Minor,
    Dominant7,
    Minor7,
    HalfDiminished7,
    Major7,
    Augmented,
    Diminished7,
}

impl ChordKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "M" | "maj" | "major" => ChordKind::Major,
            "m" | "min" | "minor" => ChordKind::Minor,
            "7" | "dom7" => ChordKind::Dominant7,
            "m7" | "min7" => ChordKind::Minor7,
            "hdim7" | "m7b5" => ChordKind::HalfDiminished7,
            "maj7" | "M7" => ChordKind::Major7,
            "aug" | "augmented" => ChordKind::Augmented,
            "dim7" => ChordKind::Diminished7,
            _ => return None,
        };
        Some(kind)
    }

    /// Offsets above the root in the given space
    pub fn offsets(&self, space: TonnetzSpace) -> Vec<i64> {
        let TonnetzSpace { a, b, .. } = space;
        match self {
            ChordKind::Major => vec![0, b, a + b],
            ChordKind::Minor => vec![0, a, a + b],
            ChordKind::Dominant7 => vec![0, b, a + b, 2 * a + b],
            ChordKind::Minor7 => vec![0, a, a + b, 2 * a + b],
            ChordKind::HalfDiminished7 => vec![0, a, 2 * a, 2 * a + b],
            ChordKind::Major7 => vec![0, b, a + b, a + 2 * b],
            ChordKind::Augmented => vec![0, b, 2 * b],
            ChordKind::Diminished7 => vec![0, a, 2 * a, 3 * a],
        }
    }
}

/// Pitch classes of a chord of `kind` on `root`, in root position. A space
/// without a positive modulus leaves the notes unreduced.
pub fn chord_from_tonnetz(root: i64, kind: ChordKind, space: TonnetzSpace) -> Vec<i64> {
    let modulus = space.modulus();
    kind.offsets(space)
        .into_iter()
        .map(|offset| if modulus > 0 { (root + offset).rem_euclid(modulus) } else { root + offset })
        .collect()
}

fn same_set(left: &[i64], right: &[i64], modulus: i64) -> bool {
    let normalize = |notes: &[i64]| {
        let mut pcs: Vec<i64> = notes.iter().map(|n| n.rem_euclid(modulus)).collect();
        pcs.sort_unstable();
        pcs.dedup();
        pcs
    };
    normalize(left) == normalize(right)
}

/// Neo-Riemannian transformations for triads and seventh chords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transformation {
    P,
    L,
    R,
    P12,
    P14,
    P23,
    P35,
    R12,
    R23,
    R35,
    R42,
    L13,
    L71,
}

impl Transformation {
    pub fn from_name(name: &str) -> Option<Self> {
        let transformation = match name.to_ascii_lowercase().as_str() {
            "p" => Transformation::P,
            "l" => Transformation::L,
            "r" => Transformation::R,
            "p12" => Transformation::P12,
            "p14" => Transformation::P14,
            "p23" => Transformation::P23,
            "p35" => Transformation::P35,
            "r12" => Transformation::R12,
            "r23" => Transformation::R23,
            "r35" => Transformation::R35,
            "r42" => Transformation::R42,
            "l13" => Transformation::L13,
            "l71" => Transformation::L71,
            _ => return None,
        };
        Some(transformation)
    }

    /// The chord type pair this transformation swaps and the root offset
    /// applied going from the first type to the second.
    fn mapping(&self, space: TonnetzSpace) -> (ChordKind, ChordKind, i64) {
        use ChordKind::*;
        let TonnetzSpace { a, b, .. } = space;
        match self {
            Transformation::P => (Major, Minor, 0),
            Transformation::L => (Major, Minor, b),
            Transformation::R => (Major, Minor, -a),
            Transformation::P12 => (Dominant7, Minor7, 0),
            Transformation::P14 => (Dominant7, HalfDiminished7, 0),
            Transformation::P23 => (Minor7, HalfDiminished7, 0),
            Transformation::P35 => (Major7, Minor7, 0),
            Transformation::R12 => (Dominant7, Minor7, -a),
            Transformation::R23 => (HalfDiminished7, Minor7, a),
            Transformation::R35 => (Dominant7, HalfDiminished7, b),
            Transformation::R42 => (Major7, Minor7, -a),
            Transformation::L13 => (Major7, Minor7, b),
            Transformation::L71 => (Major7, Dominant7, 0),
        }
    }

    /// Apply to a chord given as notes or pitch classes. Chords that are not
    /// one of the two types this transformation relates come back unchanged,
    /// as does every chord in a space where the two types coincide (`a == b`).
    pub fn apply(&self, chord: &[i64], space: TonnetzSpace) -> Vec<i64> {
        let modulus = space.modulus();
        let (from, to, offset) = self.mapping(space);
        if modulus <= 0 || same_set(&from.offsets(space), &to.offsets(space), modulus) {
            return chord.to_vec();
        }
        for &note in chord {
            let root = note.rem_euclid(modulus);
            if same_set(&chord_from_tonnetz(root, from, space), chord, modulus) {
                return chord_from_tonnetz(root + offset, to, space);
            }
            if same_set(&chord_from_tonnetz(root, to, space), chord, modulus) {
                return chord_from_tonnetz(root - offset, from, space);
            }
        }
        chord.to_vec()
    }
}

/// Split a transformation string such as `"plr"` or `"p12r23"` into names,
/// preferring the longest known name at each position. Unknown characters are
/// skipped.
pub fn parse_transformations(names: &str) -> Vec<Transformation> {
    let chars: Vec<char> = names.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parsed = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let long: String = chars[i..chars.len().min(i + 3)].iter().collect();
        if long.len() == 3 {
            if let Some(t) = Transformation::from_name(&long) {
                parsed.push(t);
                i += 3;
                continue;
            }
        }
        if let Some(t) = Transformation::from_name(&chars[i].to_string()) {
            parsed.push(t);
        }
        i += 1;
    }
    parsed
}

/// Apply a chain of named transformations left to right
pub fn transform(chord: &[i64], names: &str, space: TonnetzSpace) -> Vec<i64> {
    parse_transformations(names)
        .iter()
        .fold(chord.to_vec(), |current, t| t.apply(&current, space))
}

/// Cycles of chords generated by repeated root movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleKind {
    /// Major and minor triads descending by `b`
    Hexatonic,
    /// Major and minor triads ascending by `a`
    Octatonic,
    /// Dominant, minor and half diminished sevenths descending by `b`
    Enneatonic,
}

impl CycleKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hexa" | "hexatonic" => Some(CycleKind::Hexatonic),
            "octa" | "octatonic" => Some(CycleKind::Octatonic),
            "ennea" | "enneatonic" => Some(CycleKind::Enneatonic),
            _ => None,
        }
    }
}

pub fn cycle(root: i64, kind: CycleKind, space: TonnetzSpace, reps: usize) -> Vec<Vec<i64>> {
    let TonnetzSpace { a, b, .. } = space;
    let (step, kinds): (i64, &[ChordKind]) = match kind {
        CycleKind::Hexatonic => (-b, &[ChordKind::Major, ChordKind::Minor]),
        CycleKind::Octatonic => (a, &[ChordKind::Major, ChordKind::Minor]),
        CycleKind::Enneatonic => (
            -b,
            &[ChordKind::Dominant7, ChordKind::Minor7, ChordKind::HalfDiminished7],
        ),
    };
    (0..reps as i64)
        .flat_map(|i| {
            kinds
                .iter()
                .map(move |&k| chord_from_tonnetz(root + step * i, k, space))
        })
        .collect()
}

pub fn hexa_cycle(root: i64, space: TonnetzSpace, reps: usize) -> Vec<Vec<i64>> {
    cycle(root, CycleKind::Hexatonic, space, reps)
}

pub fn octa_cycle(root: i64, space: TonnetzSpace, reps: usize) -> Vec<Vec<i64>> {
    cycle(root, CycleKind::Octatonic, space, reps)
}

pub fn ennea_cycle(root: i64, space: TonnetzSpace, reps: usize) -> Vec<Vec<i64>> {
    cycle(root, CycleKind::Enneatonic, space, reps)
}

/// A symmetric chord and the chords one voice step away from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub center: Vec<i64>,
    pub neighbors: Vec<Vec<i64>>,
}

/// Augmented triad surrounded by its six major and minor neighbors
pub fn weitzmann_region(root: i64, space: TonnetzSpace) -> Region {
    let TonnetzSpace { a, b, c } = space;
    let minor = |r| chord_from_tonnetz(r, ChordKind::Minor, space);
    let major = |r| chord_from_tonnetz(r, ChordKind::Major, space);
    Region {
        center: chord_from_tonnetz(root, ChordKind::Augmented, space),
        neighbors: vec![
            minor(root + b - a),
            minor(root + c),
            minor(root + b + c),
            major(root),
            major(root - b),
            major(root + b),
        ],
    }
}

/// Diminished seventh surrounded by its eight dominant and half diminished neighbors
pub fn boretz_region(root: i64, space: TonnetzSpace) -> Region {
    let TonnetzSpace { a, b, c } = space;
    let dominant = |r| chord_from_tonnetz(r, ChordKind::Dominant7, space);
    let half_diminished = |r| chord_from_tonnetz(r, ChordKind::HalfDiminished7, space);
    Region {
        center: chord_from_tonnetz(root, ChordKind::Diminished7, space),
        neighbors: vec![
            dominant(root - (b - a)),
            half_diminished(root + a),
            dominant(root + (c - a)),
            half_diminished(root + c + (b - a)),
            dominant(root - (a + b)),
            half_diminished(root - a),
            dominant(root - b),
            half_diminished(root),
        ],
    }
}

/// Three columns of seventh chords descending by `a`: half diminished,
/// minor and the dominant a step above.
pub fn octa_towers(root: i64, space: TonnetzSpace, reps: usize) -> [Vec<Vec<i64>>; 3] {
    let a = space.a;
    let mut towers: [Vec<Vec<i64>>; 3] = Default::default();
    for i in 0..=reps as i64 {
        let base = root - a * i;
        towers[0].push(chord_from_tonnetz(base, ChordKind::HalfDiminished7, space));
        towers[1].push(chord_from_tonnetz(base, ChordKind::Minor7, space));
        towers[2].push(chord_from_tonnetz(base + a, ChordKind::Dominant7, space));
    }
    towers
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEVENTHS: [Transformation; 10] = [
        Transformation::P12,
        Transformation::P14,
        Transformation::P23,
        Transformation::P35,
        Transformation::R12,
        Transformation::R23,
        Transformation::R35,
        Transformation::R42,
        Transformation::L13,
        Transformation::L71,
    ];

    const SPACES: [(i64, i64, i64); 12] = [
        (3, 4, 5),
        (1, 1, 10),
        (1, 2, 9),
        (1, 3, 8),
        (1, 4, 7),
        (1, 5, 6),
        (2, 3, 7),
        (2, 5, 5),
        (2, 4, 6),
        (2, 2, 8),
        (3, 3, 6),
        (4, 4, 4),
    ];

    fn space_at(index: usize) -> TonnetzSpace {
        let (a, b, c) = SPACES[index];
        TonnetzSpace::new(a, b, c)
    }

    fn sorted(mut notes: Vec<i64>) -> Vec<i64> {
        notes.sort_unstable();
        notes
    }

    #[test]
    fn test_chord_builders() {
        let space = TonnetzSpace::default();
        assert_eq!(chord_from_tonnetz(0, ChordKind::Major, space), vec![0, 4, 7]);
        assert_eq!(chord_from_tonnetz(0, ChordKind::Minor, space), vec![0, 3, 7]);
        assert_eq!(chord_from_tonnetz(5, ChordKind::Major, space), vec![5, 9, 0]);
        assert_eq!(chord_from_tonnetz(0, ChordKind::Dominant7, space), vec![0, 4, 7, 10]);
        assert_eq!(chord_from_tonnetz(0, ChordKind::HalfDiminished7, space), vec![0, 3, 6, 10]);
        assert_eq!(chord_from_tonnetz(0, ChordKind::Major7, space), vec![0, 4, 7, 11]);
        assert_eq!(chord_from_tonnetz(0, ChordKind::Diminished7, space), vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_triad_transformations() {
        let space = TonnetzSpace::default();
        let c_major = vec![0, 4, 7];
        assert_eq!(transform(&c_major, "p", space), vec![0, 3, 7]);
        assert_eq!(transform(&c_major, "r", space), vec![9, 0, 4]);
        assert_eq!(transform(&c_major, "l", space), vec![4, 7, 11]);
        assert_eq!(transform(&c_major, "pp", space), c_major);
        assert_eq!(transform(&c_major, "plr", space), vec![5, 8, 0]);
    }

    #[test]
    fn test_p12_twice_restores_dominant() {
        let dominant = vec![0, 4, 7, 10];
        let space = TonnetzSpace::default();
        assert_eq!(transform(&dominant, "p12", space), vec![0, 3, 7, 10]);
        assert_eq!(transform(&dominant, "p12p12", space), dominant);
    }

    #[test]
    fn test_unknown_names_are_noops() {
        let chord = vec![0, 4, 7];
        let space = TonnetzSpace::default();
        assert_eq!(transform(&chord, "xyz", space), chord);
        // a triad transformation leaves sevenths alone
        assert_eq!(transform(&[0, 4, 7, 10], "p", space), vec![0, 4, 7, 10]);
        assert_eq!(transform(&[0, 1, 2], "p", space), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_transformations() {
        assert_eq!(
            parse_transformations("p12 rl71"),
            vec![Transformation::P12, Transformation::R, Transformation::L71]
        );
    }

    #[test]
    fn test_cycles() {
        let space = TonnetzSpace::default();
        let hexa = hexa_cycle(0, space, 3);
        assert_eq!(hexa.len(), 6);
        assert_eq!(hexa[0], vec![0, 4, 7]);
        assert_eq!(hexa[2], vec![8, 0, 3]);
        assert_eq!(octa_cycle(0, space, 4)[2], vec![3, 7, 10]);
        assert_eq!(ennea_cycle(0, space, 3).len(), 9);
    }

    #[test]
    fn test_regions() {
        let space = TonnetzSpace::default();
        let weitzmann = weitzmann_region(0, space);
        assert_eq!(weitzmann.center, vec![0, 4, 8]);
        assert_eq!(weitzmann.neighbors.len(), 6);
        assert_eq!(weitzmann.neighbors[3], vec![0, 4, 7]);

        let boretz = boretz_region(0, space);
        assert_eq!(boretz.center, vec![0, 3, 6, 9]);
        assert_eq!(boretz.neighbors.len(), 8);
        assert_eq!(boretz.neighbors[7], vec![0, 3, 6, 10]);
    }

    #[test]
    fn test_octa_towers() {
        let towers = octa_towers(0, TonnetzSpace::default(), 3);
        assert_eq!(towers[1].len(), 4);
        assert_eq!(towers[1][1], vec![9, 0, 4, 7]);
        assert_eq!(towers[2][0], vec![3, 7, 10, 1]);
    }

    #[test]
    fn test_coinciding_types_are_left_alone() {
        let space = TonnetzSpace::new(2, 2, 8);
        let major = chord_from_tonnetz(0, ChordKind::Major, space);
        assert_eq!(major, vec![0, 2, 4]);
        assert_eq!(Transformation::L.apply(&major, space), major);
        assert_eq!(transform(&major, "ll", space), major);

        let dom7 = chord_from_tonnetz(3, ChordKind::Dominant7, TonnetzSpace::new(3, 3, 6));
        assert_eq!(Transformation::R35.apply(&dom7, TonnetzSpace::new(3, 3, 6)), dom7);
    }

    #[test]
    fn test_every_space_keeps_involutions() {
        let kinds = [ChordKind::Major, ChordKind::Minor];
        for index in 0..SPACES.len() {
            let space = space_at(index);
            for root in 0..space.modulus() {
                for kind in kinds {
                    let chord = chord_from_tonnetz(root, kind, space);
                    for name in ["p", "l", "r"] {
                        let twice = transform(&chord, &format!("{0}{0}", name), space);
                        assert_eq!(sorted(twice), sorted(chord.clone()), "{}{} in {:?}", name, name, space);
                    }
                }
            }
        }
    }

    #[test]
    fn test_degenerate_space_is_a_no_op() {
        let space = TonnetzSpace::new(0, 0, 0);
        assert_eq!(Transformation::P.apply(&[0, 4, 7], space), vec![0, 4, 7]);
    }

    proptest! {
        #[test]
        fn seventh_transformations_are_involutions(
            root in 0i64..12,
            index in 0usize..10,
            kind in 0usize..4,
            space in 0usize..12,
        ) {
            let space = space_at(space);
            let kinds = [
                ChordKind::Dominant7,
                ChordKind::Minor7,
                ChordKind::HalfDiminished7,
                ChordKind::Major7,
            ];
            let chord = chord_from_tonnetz(root, kinds[kind], space);
            let t = SEVENTHS[index];
            let twice = t.apply(&t.apply(&chord, space), space);
            prop_assert_eq!(sorted(twice), sorted(chord));
        }

        #[test]
        fn triad_transformations_are_involutions(root in 0i64..12, minor: bool, name in "[plr]", space in 0usize..12) {
            let space = space_at(space);
            let kind = if minor { ChordKind::Minor } else { ChordKind::Major };
            let chord = chord_from_tonnetz(root, kind, space);
            let twice = transform(&chord, &format!("{0}{0}", name), space);
            prop_assert_eq!(sorted(twice), sorted(chord));
        }
    }
}
