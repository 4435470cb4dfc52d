//! Integer sequences for generator-fed patterns
//!
//! Each sequence is an infinite iterator of `i64`, so any of them can drive a
//! pattern that re-parses its source from a fresh number every lap.

/// Fibonacci-like sequence where each term is the sum of the previous `order`
/// terms. Terms wrap on overflow.
#[derive(Debug, Clone)]
pub struct NBonacci {
    window: Vec<i64>,
    modulo: Option<i64>,
}

impl NBonacci {
    /// Starts from `order - 1` zeros followed by a one
    pub fn new(order: usize) -> Self {
        let order = order.max(2);
        let mut window = vec![0; order];
        window[order - 1] = 1;
        NBonacci {
            window,
            modulo: None,
        }
    }

    /// Same recurrence with every term reduced modulo `modulo`
    pub fn modular(order: usize, modulo: i64) -> Self {
        NBonacci {
            modulo: (modulo > 0).then_some(modulo),
            ..NBonacci::new(order)
        }
    }
}

impl Iterator for NBonacci {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.window[0];
        let mut sum = self.window.iter().fold(0i64, |acc, n| acc.wrapping_add(*n));
        if let Some(m) = self.modulo {
            sum = sum.rem_euclid(m);
        }
        self.window.rotate_left(1);
        if let Some(last) = self.window.last_mut() {
            *last = sum;
        }
        Some(current)
    }
}

pub fn fibonacci() -> NBonacci {
    NBonacci::new(2)
}

pub fn tribonacci() -> NBonacci {
    NBonacci::new(3)
}

/// Exponent of the largest power of `prime` dividing `n`; 0 for `n < 1`
pub fn padic_valuation(n: i64, prime: i64) -> i64 {
    if n < 1 || prime < 2 {
        return 0;
    }
    let mut n = n;
    let mut valuation = 0;
    while n % prime == 0 {
        n /= prime;
        valuation += 1;
    }
    valuation
}

/// `prime ^ -valuation`, with the norm of 0 defined as 0
pub fn padic_norm(n: i64, prime: i64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (prime as f64).powi(-(padic_valuation(n, prime) as i32))
}

/// The first `precision - 1` base-`prime` digits of `n`, least significant
/// first. Stops early once `prime ^ i` no longer fits in an `i64`; empty for
/// `prime < 2`.
pub fn padic_expansion(n: i64, prime: i64, precision: u32) -> Vec<i64> {
    if prime < 2 {
        return Vec::new();
    }
    let mut digits = Vec::new();
    let mut previous = 0;
    let mut place = 1;
    for i in 1..precision {
        let Some(modulus) = prime.checked_pow(i) else {
            break;
        };
        let residue = n.rem_euclid(modulus);
        digits.push((residue - previous) / place);
        previous = residue;
        place = modulus;
    }
    digits
}

/// p-adic valuations of an n-bonacci sequence
pub fn padic_nbonacci(order: usize, prime: i64) -> impl Iterator<Item = i64> {
    NBonacci::new(order).map(move |n| padic_valuation(n, prime))
}
