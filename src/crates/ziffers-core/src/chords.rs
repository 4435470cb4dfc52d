//! Named chords, inversions, voice leading and pitch class set forms

use tracing::warn;

static CHORDS: &[(&str, &[i64])] = &[
    ("major", &[0, 4, 7]),
    ("maj", &[0, 4, 7]),
    ("M", &[0, 4, 7]),
    ("minor", &[0, 3, 7]),
    ("min", &[0, 3, 7]),
    ("m", &[0, 3, 7]),
    ("aug", &[0, 4, 8]),
    ("dim", &[0, 3, 6]),
    ("sus2", &[0, 2, 7]),
    ("sus4", &[0, 5, 7]),
    ("6", &[0, 4, 7, 9]),
    ("m6", &[0, 3, 7, 9]),
    ("7", &[0, 4, 7, 10]),
    ("dom7", &[0, 4, 7, 10]),
    ("maj7", &[0, 4, 7, 11]),
    ("M7", &[0, 4, 7, 11]),
    ("m7", &[0, 3, 7, 10]),
    ("min7", &[0, 3, 7, 10]),
    ("mMaj7", &[0, 3, 7, 11]),
    ("dim7", &[0, 3, 6, 9]),
    ("hdim7", &[0, 3, 6, 10]),
    ("m7b5", &[0, 3, 6, 10]),
    ("augMaj7", &[0, 4, 8, 11]),
    ("aug7", &[0, 4, 8, 10]),
    ("9", &[0, 4, 7, 10, 14]),
    ("maj9", &[0, 4, 7, 11, 14]),
    ("m9", &[0, 3, 7, 10, 14]),
    ("add9", &[0, 4, 7, 14]),
    ("11", &[0, 4, 7, 10, 14, 17]),
    ("m11", &[0, 3, 7, 10, 14, 17]),
    ("13", &[0, 4, 7, 10, 14, 17, 21]),
    ("five", &[0, 7]),
];

const MAJOR_TRIAD: &[i64] = &[0, 4, 7];

/// Look up a chord by name. Exact matches win so `M7` and `m7` stay distinct,
/// then the lookup retries ignoring case.
pub fn named_chord(name: &str) -> Option<&'static [i64]> {
    CHORDS
        .iter()
        .find(|(chord, _)| *chord == name)
        .or_else(|| CHORDS.iter().find(|(chord, _)| chord.eq_ignore_ascii_case(name)))
        .map(|(_, intervals)| *intervals)
}

pub fn is_chord_name(name: &str) -> bool {
    named_chord(name).is_some()
}

/// Chord intervals for `name`, or a major triad when the name is unknown
pub fn chord_intervals(name: &str) -> &'static [i64] {
    named_chord(name).unwrap_or_else(|| {
        warn!(chord = name, "unknown chord name, using major triad");
        MAJOR_TRIAD
    })
}

/// Re-voice a chord by octave shifts.
///
/// A positive `k` raises the bottom `k` voices one octave each, cycling
/// through the voices when `k` exceeds the chord size; voice order is kept.
/// A negative `k` reverses the voices and then lowers the first `|k|`.
pub fn invert<T>(mut voices: Vec<T>, k: i32, mut shift_octave: impl FnMut(&mut T, i64)) -> Vec<T> {
    if voices.is_empty() || k == 0 {
        return voices;
    }
    let len = voices.len() as i64;
    let steps = i64::from(k.unsigned_abs());
    let direction = if k > 0 { 1 } else { -1 };
    if k < 0 {
        voices.reverse();
    }
    for (i, voice) in voices.iter_mut().enumerate() {
        let octaves = steps / len + i64::from((i as i64) < steps % len);
        if octaves > 0 {
            shift_octave(voice, direction * octaves);
        }
    }
    voices
}

/// Pairings beyond this count fall back to matching voices by pitch class rank
const SEARCH_LIMIT: usize = 50_000;

/// Octave of `to` closest to `from`, moving at most a tritone
fn nearest(from: i64, to: i64) -> i64 {
    let mut step = (to - from).rem_euclid(12);
    if step > 6 {
        step -= 12;
    }
    from + step
}

fn movement(from: i64, to: i64) -> i64 {
    (nearest(from, to) - from).abs()
}

/// Number of ways to pair voices of two chords, saturating past the limit
fn pairings(prev: usize, next: usize) -> usize {
    let (longer, shorter) = (prev.max(next), prev.min(next));
    (0..shorter).try_fold(1usize, |count, i| {
        let count = count.saturating_mul(longer - i);
        (count <= SEARCH_LIMIT).then_some(count)
    })
    .unwrap_or(usize::MAX)
}

/// Depth-first search over the voice pairings, keeping the first one found
/// with the least total movement.
struct Pairing<'a> {
    prev: &'a [i64],
    next: &'a [i64],
    used: Vec<bool>,
    current: Vec<Option<usize>>,
    best: Vec<Option<usize>>,
    best_cost: i64,
    skips: usize,
}

impl<'a> Pairing<'a> {
    fn new(prev: &'a [i64], next: &'a [i64]) -> Self {
        Pairing {
            prev,
            next,
            used: vec![false; next.len()],
            current: vec![None; prev.len()],
            best: vec![None; prev.len()],
            best_cost: i64::MAX,
            skips: prev.len().saturating_sub(next.len()),
        }
    }

    fn visit(&mut self, voice: usize, cost: i64) {
        if cost >= self.best_cost {
            return;
        }
        if voice == self.prev.len() {
            self.best_cost = cost;
            self.best.clone_from(&self.current);
            return;
        }
        for n in 0..self.next.len() {
            if self.used[n] {
                continue;
            }
            self.used[n] = true;
            self.current[voice] = Some(n);
            self.visit(voice + 1, cost + movement(self.prev[voice], self.next[n]));
            self.used[n] = false;
            self.current[voice] = None;
        }
        // A voice of `prev` drops out when `next` has fewer voices
        if self.skips > 0 {
            self.skips -= 1;
            self.visit(voice + 1, cost);
            self.skips += 1;
        }
    }

    fn search(mut self) -> Vec<Option<usize>> {
        self.visit(0, 0);
        self.best
    }
}

/// Pair voices by pitch class rank, for chords too large to search
fn rank_pairing(prev: &[i64], next: &[i64]) -> Vec<Option<usize>> {
    let by_pitch_class = |notes: &[i64]| {
        let mut order: Vec<usize> = (0..notes.len()).collect();
        order.sort_by_key(|&i| (notes[i].rem_euclid(12), notes[i]));
        order
    };
    let mut pairing = vec![None; prev.len()];
    for (&p, &n) in by_pitch_class(prev).iter().zip(&by_pitch_class(next)) {
        pairing[p] = Some(n);
    }
    pairing
}

/// Move the voices of `next` to the octaves closest to the voices of `prev`.
///
/// Each paired voice moves by at most a tritone and the pairing is the one
/// with the least total movement; ties keep the earliest pairing in voice
/// order. Returns `(index into next, new note)` in the voice order of `prev`,
/// followed by any unpaired voices of `next` unchanged.
pub fn voice_lead(prev: &[i64], next: &[i64]) -> Vec<(usize, i64)> {
    if prev.is_empty() || next.is_empty() {
        return next.iter().copied().enumerate().collect();
    }
    let pairing = if pairings(prev.len(), next.len()) <= SEARCH_LIMIT {
        Pairing::new(prev, next).search()
    } else {
        rank_pairing(prev, next)
    };

    let mut paired = vec![false; next.len()];
    let mut led = Vec::with_capacity(next.len());
    for (voice, n) in pairing.into_iter().enumerate() {
        if let Some(n) = n {
            paired[n] = true;
            led.push((n, nearest(prev[voice], next[n])));
        }
    }
    led.extend(
        next.iter()
            .enumerate()
            .filter(|&(n, _)| !paired[n])
            .map(|(n, &note)| (n, note)),
    );
    led
}

/// Sorted, de-duplicated pitch classes of a chord
pub fn chord_to_pc_set(notes: &[i64], base: i64) -> Vec<i64> {
    let mut pcs: Vec<i64> = notes.iter().map(|n| n.rem_euclid(base)).collect();
    pcs.sort_unstable();
    pcs.dedup();
    pcs
}

fn bitmask(pcs: &[i64]) -> u64 {
    pcs.iter().fold(0, |acc, pc| acc | 1 << pc)
}

/// Canonical rotation of a pitch class set.
///
/// Every rotation is transposed to start at 0 and encoded as a bitmask with bit
/// `i` set for pitch class `i`; the smallest mask wins and ties go to the
/// smaller rotation. Returns the winning rotation's pitch classes.
pub fn normal_form(notes: &[i64]) -> Vec<i64> {
    normal_form_in(notes, 12)
}

pub fn normal_form_in(notes: &[i64], base: i64) -> Vec<i64> {
    let pcs = chord_to_pc_set(notes, base);
    (0..pcs.len())
        .map(|start| {
            let rotation: Vec<i64> = pcs[start..].iter().chain(&pcs[..start]).copied().collect();
            let reduced: Vec<i64> = rotation
                .iter()
                .map(|pc| (pc - rotation[0]).rem_euclid(base))
                .collect();
            (bitmask(&reduced), rotation)
        })
        .min()
        .map(|(_, rotation)| rotation)
        .unwrap_or_default()
}

/// Normal form of the set or its inversion, transposed to start at 0
pub fn prime_form(notes: &[i64]) -> Vec<i64> {
    let zeroed = |form: Vec<i64>| -> Vec<i64> {
        let first = form.first().copied().unwrap_or(0);
        form.iter().map(|pc| (pc - first).rem_euclid(12)).collect()
    };
    let inverted: Vec<i64> = notes.iter().map(|n| (-n).rem_euclid(12)).collect();
    let candidates = [zeroed(normal_form(notes)), zeroed(normal_form(&inverted))];
    candidates
        .into_iter()
        .min_by_key(|form| (bitmask(form), form.clone()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn invert_notes(notes: &[i64], k: i32) -> Vec<i64> {
        invert(notes.to_vec(), k, |note, octaves| *note += 12 * octaves)
    }

    #[test]
    fn test_named_chord_lookup() {
        assert_eq!(named_chord("maj7"), Some(&[0, 4, 7, 11][..]));
        assert_eq!(named_chord("M7"), Some(&[0, 4, 7, 11][..]));
        assert_eq!(named_chord("m7"), Some(&[0, 3, 7, 10][..]));
        assert_eq!(named_chord("MIN"), Some(&[0, 3, 7][..]));
        assert_eq!(chord_intervals("nonsense"), &[0, 4, 7]);
    }

    #[test]
    fn test_inversions() {
        assert_eq!(invert_notes(&[60, 64, 67], 1), vec![72, 64, 67]);
        assert_eq!(invert_notes(&[60, 64, 67], 4), vec![84, 76, 79]);
        assert_eq!(invert_notes(&[60, 64, 67], -1), vec![55, 64, 60]);
        assert_eq!(invert_notes(&[60, 64, 67], 0), vec![60, 64, 67]);
        assert_eq!(invert_notes(&[60, 64, 67], 7), vec![96, 88, 91]);
        assert_eq!(invert_notes(&[60, 64, 67], -4), vec![43, 52, 48]);
    }

    #[test]
    fn test_large_inversion_shifts_each_voice_once() {
        let mut calls = 0;
        let voiced = invert(vec![0i64, 4, 7], i32::MAX, |note, octaves| {
            calls += 1;
            *note += 12 * octaves;
        });
        assert_eq!(calls, 3);
        assert_eq!(voiced, vec![8589934596, 8589934588, 8589934591]);
    }

    #[test]
    fn test_voice_lead_progression() {
        let lead = |prev: &[i64], next: &[i64]| -> Vec<i64> {
            voice_lead(prev, next).into_iter().map(|(_, note)| note).collect()
        };
        let second = lead(&[60, 64, 67], &[67, 71, 74]);
        assert_eq!(second, vec![59, 62, 67]);
        assert_eq!(lead(&second, &[69, 72, 76]), vec![60, 64, 69]);
    }

    #[test]
    fn test_voice_lead_minimises_total_movement() {
        // Rank pairing would give [66, 59], moving 8 semitones in total
        let led = voice_lead(&[60, 61], &[66, 71]);
        assert_eq!(led, vec![(1, 59), (0, 66)]);
        let total: i64 = led.iter().zip([60, 61]).map(|(&(_, note), from)| (note - from).abs()).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_voice_lead_fewer_voices() {
        assert_eq!(voice_lead(&[60, 64, 67], &[71, 74]), vec![(0, 59), (1, 62)]);
        assert_eq!(voice_lead(&[], &[60, 64]), vec![(0, 60), (1, 64)]);
        assert!(voice_lead(&[60], &[]).is_empty());
    }

    #[test]
    fn test_voice_lead_extra_voices() {
        let led = voice_lead(&[60, 64], &[60, 64, 67]);
        assert_eq!(led, vec![(0, 60), (1, 64), (2, 67)]);
    }

    #[test]
    fn test_large_chords_fall_back_to_rank_pairing() {
        let prev: Vec<i64> = (60..72).collect();
        let next: Vec<i64> = (61..73).collect();
        let led = voice_lead(&prev, &next);
        assert_eq!(led.len(), 12);
        assert!(led.iter().zip(&prev).all(|(&(_, note), &from)| (note - from).abs() <= 6));
    }

    #[test]
    fn test_normal_form() {
        assert_eq!(normal_form(&[64, 71, 67, 72]), vec![11, 0, 4, 7]);
        assert_eq!(normal_form(&[11, 7, 2, 3]), vec![11, 2, 3, 7]);
        assert_eq!(normal_form(&[]), Vec::<i64>::new());
    }

    #[test]
    fn test_prime_form() {
        assert_eq!(prime_form(&[60, 64, 67]), vec![0, 3, 7]);
        assert_eq!(prime_form(&[62, 65, 69]), vec![0, 3, 7]);
        assert_eq!(prime_form(&[0, 4, 8]), vec![0, 4, 8]);
    }

    fn total_movement(prev: &[i64], next: &[i64], pairing: &[Option<usize>]) -> i64 {
        pairing
            .iter()
            .enumerate()
            .filter_map(|(voice, n)| n.map(|n| movement(prev[voice], next[n])))
            .sum()
    }

    proptest! {
        #[test]
        fn voice_lead_keeps_pitch_classes_and_beats_rank_pairing(
            prev in prop::collection::vec(36i64..96, 1..6),
            next in prop::collection::vec(36i64..96, 1..6),
        ) {
            let led = voice_lead(&prev, &next);
            let mut indices: Vec<usize> = led.iter().map(|&(n, _)| n).collect();
            indices.sort_unstable();
            prop_assert_eq!(indices, (0..next.len()).collect::<Vec<_>>());
            for &(n, note) in &led {
                prop_assert_eq!(note.rem_euclid(12), next[n].rem_euclid(12));
            }

            let searched = Pairing::new(&prev, &next).search();
            let ranked = rank_pairing(&prev, &next);
            prop_assert!(total_movement(&prev, &next, &searched) <= total_movement(&prev, &next, &ranked));
        }
    }
}
