//! The alternating reciprocal-odd series
//!
//! π = 4 * (1 + y) where y = -1/3 + 1/5 - 1/7 + ...
//!
//! Index 0 is -1/3. The denominator grows by 2 and the sign flips at every
//! step, so the sign at any index follows from its parity and a worker can
//! start mid-series without replaying earlier terms.
//!
//! Rounding error grows with the number of independently rounded partial sums
//! merged into the accumulator. That drift is expected and left uncorrected.

use crate::partition::WorkRange;

/// Widest native float; every sum in the engine uses it
pub type Real = f64;

/// π to 20 decimals, printed next to the approximation
pub const REFERENCE_PI: &str = "3.14159265358979323846";

/// Sign of the term at `index`: even indices are negative
#[inline]
pub fn sign_at(index: u64) -> Real {
    if index % 2 == 0 { -1.0 } else { 1.0 }
}

#[inline]
fn denominator_at(index: u64) -> Real {
    3.0 + 2.0 * index as Real
}

/// Value of the term at `index`
pub fn term(index: u64) -> Real {
    sign_at(index) / denominator_at(index)
}

/// Iterator over `(index, term)` for every index in a range
///
/// Keeps a running sign and denominator instead of recomputing parity.
#[derive(Debug, Clone)]
pub struct Terms {
    index: u64,
    end: u64,
    sign: Real,
    denominator: Real,
}

impl Iterator for Terms {
    type Item = (u64, Real);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }
        let item = (self.index, self.sign / self.denominator);
        self.index += 1;
        self.denominator += 2.0;
        self.sign = -self.sign;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.end - self.index).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

pub fn terms(range: WorkRange) -> Terms {
    Terms {
        index: range.start,
        end: range.end(),
        sign: sign_at(range.start),
        denominator: denominator_at(range.start),
    }
}

/// Final approximation from the merged series sum
pub fn approximate_pi(series_sum: Real) -> Real {
    4.0 * (1.0 + series_sum)
}

/// Single-threaded reference run over `[0, iterations)`
pub fn sequential_pi(iterations: u64) -> Real {
    let mut sum: Real = 0.0;
    for (_, t) in terms(WorkRange::new(0, iterations)) {
        sum += t;
    }
    approximate_pi(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_first_terms() {
        assert_eq!(term(0), -1.0 / 3.0);
        assert_eq!(term(1), 1.0 / 5.0);
        assert_eq!(term(2), -1.0 / 7.0);
    }

    #[test]
    fn test_sign_follows_parity() {
        for i in 0..64u64 {
            assert_eq!(term(i) < 0.0, i % 2 == 0, "index {i}");
            assert_eq!(sign_at(i), -sign_at(i + 1));
        }
    }

    #[test]
    fn test_iterator_matches_direct_terms_mid_series() {
        let from_iter: Vec<(u64, Real)> = terms(WorkRange::new(999, 5)).collect();
        let direct: Vec<(u64, Real)> = (999..1004).map(|i| (i, term(i))).collect();
        assert_eq!(from_iter, direct);
    }

    #[test]
    fn test_empty_range_yields_nothing() {
        assert_eq!(terms(WorkRange::new(42, 0)).count(), 0);
        assert_eq!(sequential_pi(0), 4.0);
    }

    #[test]
    fn test_sequential_million_terms_close_to_pi() {
        let pi = sequential_pi(1_000_000);
        assert!((pi - PI).abs() < 1e-6, "got {pi}");
    }

    #[test]
    fn test_reference_pi_parses() {
        let reference: Real = REFERENCE_PI.parse().unwrap();
        assert_eq!(reference, PI);
    }
}
