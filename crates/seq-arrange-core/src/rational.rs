use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

use crate::geometry::EPSILON;

/// Denominator used when a solver value only arrives as a decimal
/// approximation.
pub const RATIONAL_PRECISION: i64 = 1000;

/// Exact fraction of two signed 64-bit integers.
///
/// The pair is kept as constructed: no canonicalisation, negative denominators
/// allowed. Ordering goes through the floating-point projection, so equal
/// magnitudes compare approximately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: i64,
    pub denominator: i64,
}

impl Default for Rational {
    fn default() -> Self {
        Self {
            numerator: 0,
            denominator: 1,
        }
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Self {
            numerator: n,
            denominator: 1,
        }
    }
}

impl Rational {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Builds a rational from an exact solver fraction, falling back to a
    /// fixed-precision decimal when the backend did not return one.
    pub fn from_solver_fraction(fraction: Option<(i64, i64)>, approximation: f64) -> Self {
        match fraction {
            Some((numerator, denominator)) if denominator != 0 => {
                if numerator != 0 {
                    Self::new(numerator, denominator)
                } else if approximation.abs() > EPSILON {
                    Self::new(
                        (approximation * RATIONAL_PRECISION as f64) as i64,
                        RATIONAL_PRECISION,
                    )
                } else {
                    Self::default()
                }
            }
            _ => Self::new(
                (approximation * RATIONAL_PRECISION as f64) as i64,
                RATIONAL_PRECISION,
            ),
        }
    }

    pub fn is_positive(&self) -> bool {
        (self.numerator > 0 && self.denominator > 0)
            || (self.numerator < 0 && self.denominator < 0)
    }

    pub fn is_negative(&self) -> bool {
        (self.numerator > 0 && self.denominator < 0)
            || (self.numerator < 0 && self.denominator > 0)
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Truncating division.
    pub fn as_i64(&self) -> i64 {
        self.numerator / self.denominator
    }

    pub fn normalized(&self) -> Self {
        Self::new(
            (self.as_f64() * RATIONAL_PRECISION as f64) as i64,
            RATIONAL_PRECISION,
        )
    }
}

impl Add<i64> for Rational {
    type Output = Rational;

    fn add(self, val: i64) -> Rational {
        Rational::new(self.numerator + val * self.denominator, self.denominator)
    }
}

impl Mul<i64> for Rational {
    type Output = Rational;

    fn mul(self, val: i64) -> Rational {
        Rational::new(self.numerator * val, self.denominator)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_tolerate_negative_denominator() {
        assert!(Rational::new(1, 2).is_positive());
        assert!(Rational::new(-1, -2).is_positive());
        assert!(Rational::new(-1, 2).is_negative());
        assert!(Rational::new(1, -2).is_negative());
        assert!(!Rational::new(0, 1).is_positive());
        assert!(!Rational::new(0, 1).is_negative());
    }

    #[test]
    fn arithmetic_with_integers() {
        let r = Rational::new(3, 2);
        assert_eq!((r + 2).as_f64(), 3.5);
        assert_eq!((r * 4).as_i64(), 6);
    }

    #[test]
    fn truncating_division() {
        assert_eq!(Rational::new(7, 2).as_i64(), 3);
        assert_eq!(Rational::new(-7, 2).as_i64(), -3);
    }

    #[test]
    fn ordering_through_projection() {
        assert!(Rational::new(1, 3) < Rational::new(1, 2));
        assert!(Rational::new(5, -2) < Rational::new(0, 1));
    }

    #[test]
    fn normalization_projects_to_fixed_precision() {
        let r = Rational::new(1, 3).normalized();
        assert_eq!((r.numerator, r.denominator), (333, RATIONAL_PRECISION));
    }

    #[test]
    fn solver_fraction_roundtrip() {
        let r = Rational::from_solver_fraction(Some((7, 4)), 1.75);
        assert_eq!((r.numerator, r.denominator), (7, 4));
    }

    #[test]
    fn solver_decimal_fallback() {
        let r = Rational::from_solver_fraction(None, 1.5);
        assert_eq!((r.numerator, r.denominator), (1500, RATIONAL_PRECISION));

        let zero = Rational::from_solver_fraction(Some((0, 5)), 0.0);
        assert_eq!((zero.numerator, zero.denominator), (0, 1));
    }
}
