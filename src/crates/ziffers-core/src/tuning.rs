//! Scala style tuning strings
//!
//! A tuning is a whitespace separated list of pitches above the root, each one
//! of: cents (`701.955`), a ratio (`3/2`), an integer ratio (`2`), an equal
//! division step (`7\12`) or a monzo (`[-1 1 0>`). The result is the list of
//! semitone steps between consecutive pitches, starting from the root.

use crate::error::TuningError;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

type Compiled = OnceLock<Result<Regex, regex::Error>>;

/// Compile `pattern` once into `cell`, reporting a failure on every use
fn compiled(cell: &'static Compiled, pattern: &str) -> Result<&'static Regex, TuningError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|err| TuningError::Grammar(err.to_string()))
}

fn token_regex() -> Result<&'static Regex, TuningError> {
    static TOKEN: Compiled = OnceLock::new();
    compiled(&TOKEN, r"\[[^>\]]*>|\S+")
}

fn cents_regex() -> Result<&'static Regex, TuningError> {
    static CENTS: Compiled = OnceLock::new();
    compiled(&CENTS, r"^-?[0-9]*\.[0-9]*$")
}

fn ratio_regex() -> Result<&'static Regex, TuningError> {
    static RATIO: Compiled = OnceLock::new();
    compiled(&RATIO, r"^([0-9]+)(?:/([0-9]+))?$")
}

fn edo_regex() -> Result<&'static Regex, TuningError> {
    static EDO: Compiled = OnceLock::new();
    compiled(&EDO, r"^(-?[0-9]+)\\([0-9]+)$")
}

pub fn ratio_to_cents(ratio: f64) -> f64 {
    1200.0 * ratio.log2()
}

/// First `n` primes
pub fn primes(n: usize) -> Vec<u64> {
    let mut found: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2;
    while found.len() < n {
        if found.iter().take_while(|p| *p * *p <= candidate).all(|p| candidate % p != 0) {
            found.push(candidate);
        }
        candidate += 1;
    }
    found
}

/// Cents of a prime exponent vector
pub fn monzo_to_cents(monzo: &[i32]) -> f64 {
    let ratio: f64 = primes(monzo.len())
        .iter()
        .zip(monzo)
        .map(|(&p, &e)| (p as f64).powi(e))
        .product();
    ratio_to_cents(ratio)
}

/// Semitone steps between consecutive cent values, with the root prepended
pub fn cents_to_semitones(cents: &[f64]) -> Vec<f64> {
    let mut points = Vec::with_capacity(cents.len() + 1);
    if cents.first() != Some(&0.0) {
        points.push(0.0);
    }
    points.extend_from_slice(cents);
    points.windows(2).map(|w| (w[1] - w[0]) / 100.0).collect()
}

fn token_to_cents(token: &str) -> Result<f64, TuningError> {
    if let Some(body) = token.strip_prefix('[').and_then(|t| t.strip_suffix('>')) {
        let exponents = body
            .split_whitespace()
            .map(|e| e.parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| TuningError::InvalidToken(token.to_string()))?;
        return Ok(monzo_to_cents(&exponents));
    }
    if cents_regex()?.is_match(token) {
        return token
            .parse::<f64>()
            .map_err(|_| TuningError::InvalidToken(token.to_string()));
    }
    if let Some(caps) = edo_regex()?.captures(token) {
        let steps: f64 = caps[1].parse().map_err(|_| TuningError::InvalidToken(token.to_string()))?;
        let divisions: f64 = caps[2].parse().map_err(|_| TuningError::InvalidToken(token.to_string()))?;
        if divisions == 0.0 {
            return Err(TuningError::ZeroDivisions(token.to_string()));
        }
        return Ok(steps * 1200.0 / divisions);
    }
    if let Some(caps) = ratio_regex()?.captures(token) {
        let numerator: f64 = caps[1].parse().map_err(|_| TuningError::InvalidToken(token.to_string()))?;
        let denominator: f64 = match caps.get(2) {
            Some(d) => d.as_str().parse().map_err(|_| TuningError::InvalidToken(token.to_string()))?,
            None => 1.0,
        };
        if numerator == 0.0 || denominator == 0.0 {
            return Err(TuningError::InvalidRatio(token.to_string()));
        }
        return Ok(ratio_to_cents(numerator / denominator));
    }
    Err(TuningError::InvalidToken(token.to_string()))
}

/// Parse a tuning string into semitone steps, reporting why it failed
pub fn try_parse(text: &str) -> Result<Vec<f64>, TuningError> {
    let cents = token_regex()?
        .find_iter(text)
        .map(|m| token_to_cents(m.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    if cents.is_empty() {
        return Err(TuningError::Empty);
    }
    Ok(cents_to_semitones(&cents))
}

/// Parse a tuning string into semitone steps; malformed input gives an empty list
pub fn parse(text: &str) -> Vec<f64> {
    try_parse(text).unwrap_or_else(|err| {
        warn!(tuning = text, error = %err, "could not parse tuning");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_primes() {
        assert_eq!(primes(2), vec![2, 3]);
        assert_eq!(primes(5), vec![2, 3, 5, 7, 11]);
    }

    #[test]
    fn test_cents() {
        assert_close(&parse("100.0 200.0 400.0 612.0"), &[1.0, 1.0, 2.0, 2.12]);
    }

    #[test]
    fn test_ratios() {
        assert_close(&parse("9/8 5/4"), &[2.0391000173077485, 1.8240371213406]);
        assert_close(
            &parse("9/8 32/27 4/3 3/2 5/3 16/9 2/1"),
            &[
                2.0391000173077485,
                0.902249956730628,
                2.0391000173077485,
                2.0391000173077494,
                1.8240371213406001,
                1.1173128526977758,
                2.03910001730775,
            ],
        );
    }

    #[test]
    fn test_monzos() {
        assert_close(&parse("[-1 1 0> [2 -1 0>"), &[7.019550008653875, -2.0391000173077494]);
    }

    #[test]
    fn test_equal_divisions() {
        assert_close(
            &parse(r"5\29 9\29 14\29"),
            &[2.0689655172413803, 1.6551724137931019, 2.0689655172413794],
        );
    }

    #[test]
    fn test_malformed_tunings() {
        assert!(parse("major").is_empty());
        assert!(parse("").is_empty());
        assert_eq!(try_parse("0/4"), Err(TuningError::InvalidRatio("0/4".to_string())));
        assert_eq!(try_parse(r"3\0"), Err(TuningError::ZeroDivisions(r"3\0".to_string())));
    }

    #[test]
    fn test_broken_grammar_is_an_error() {
        static BROKEN: Compiled = OnceLock::new();
        assert!(matches!(compiled(&BROKEN, r"(unclosed"), Err(TuningError::Grammar(_))));
        assert!(matches!(compiled(&BROKEN, r"(unclosed"), Err(TuningError::Grammar(_))));
        assert!(token_regex().is_ok());
    }
}
