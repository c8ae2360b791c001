//! # Fixed-Point Quantities
//!
//! Zoning numbers (height in feet, floor-area ratio, buffer distances) are
//! decimal in the source data but must never reach a determination as
//! floats, since canonical bytes reject them. [`Quantity`] stores hundredths
//! in an `i64` and serializes as a decimal string (`"33"`, `"0.45"`).
//!
//! [`RelevanceWeight`] is the resolver's match weight in basis points,
//! where 10000 is full containment (1.0).

use serde::{Deserialize, Serialize};

use crate::error::QuantityError;

// ─── Quantity ────────────────────────────────────────────────────────

/// A non-float decimal with two fractional digits.
///
/// Parsing accepts plain decimals (`45`, `0.45`), LA FAR notation (`3:1`,
/// `1.5:1`) and a trailing `ft` unit. Anything finer than hundredths is
/// rounded half away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quantity {
    hundredths: i64,
}

impl Quantity {
    /// Zero.
    pub const ZERO: Quantity = Quantity { hundredths: 0 };

    /// Construct from a whole number.
    pub fn from_integer(value: i64) -> Self {
        Self {
            hundredths: value.saturating_mul(100),
        }
    }

    /// Construct from hundredths (e.g. 45 for 0.45).
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self { hundredths }
    }

    /// Round a float to the nearest hundredth.
    pub fn from_f64(value: f64) -> Result<Self, QuantityError> {
        if !value.is_finite() || value.abs() > (i64::MAX / 100) as f64 {
            return Err(QuantityError {
                input: value.to_string(),
                reason: "not a finite value in range".to_string(),
            });
        }
        Ok(Self {
            hundredths: (value * 100.0).round() as i64,
        })
    }

    /// Parse a decimal string.
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let err = |reason: &str| QuantityError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut s = input.trim();
        if let Some(stripped) = s.strip_suffix("ft") {
            s = stripped.trim_end();
        }
        if let Some((lhs, rhs)) = s.split_once(':') {
            if rhs.trim() != "1" {
                return Err(err("ratio must be written N:1"));
            }
            s = lhs.trim();
        }

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err("no digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err("not a decimal number"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err("out of range"))?
        };
        let mut frac_digits = frac.bytes().map(|b| i64::from(b - b'0'));
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths_digit = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().is_some_and(|d| d >= 5);

        let mut hundredths = whole_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(tenths * 10 + hundredths_digit))
            .ok_or_else(|| err("out of range"))?;
        if round_up {
            hundredths = hundredths.saturating_add(1);
        }
        Ok(Self {
            hundredths: if negative { -hundredths } else { hundredths },
        })
    }

    /// Raw hundredths.
    pub fn hundredths(&self) -> i64 {
        self.hundredths
    }

    /// Increase by a whole-number percentage, rounding half up.
    pub fn increased_by_percent(&self, percent: u32) -> Self {
        let factor = 100 + i64::from(percent);
        let scaled = self.hundredths.saturating_mul(factor);
        let rounded = if scaled >= 0 {
            scaled.saturating_add(50) / 100
        } else {
            scaled.saturating_sub(50) / 100
        };
        Self {
            hundredths: rounded,
        }
    }

    /// Lossy conversion for geometric comparisons.
    pub fn as_f64(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.hundredths < 0 { "-" } else { "" };
        let abs = self.hundredths.unsigned_abs();
        let whole = abs / 100;
        let frac = abs % 100;
        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else if frac % 10 == 0 {
            write!(f, "{sign}{whole}.{}", frac / 10)
        } else {
            write!(f, "{sign}{whole}.{frac:02}")
        }
    }
}

impl std::str::FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Quantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl serde::de::Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a decimal number or decimal string")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Quantity, E> {
                Ok(Quantity::from_integer(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Quantity, E> {
                i64::try_from(v)
                    .map(Quantity::from_integer)
                    .map_err(|_| E::custom("quantity out of range"))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Quantity, E> {
                Quantity::from_f64(v).map_err(E::custom)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Quantity, E> {
                Quantity::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}

// ─── Relevance Weight ────────────────────────────────────────────────

/// Match relevance in basis points, `0..=10000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelevanceWeight(u16);

impl RelevanceWeight {
    /// Full containment, 1.0.
    pub const FULL: RelevanceWeight = RelevanceWeight(10_000);

    /// Clamp basis points into range.
    pub fn from_basis_points(bp: u32) -> Self {
        Self(bp.min(10_000) as u16)
    }

    /// Convert a fraction, clamped to `[0, 1]`. NaN maps to zero.
    pub fn from_fraction(fraction: f64) -> Self {
        if !fraction.is_finite() || fraction <= 0.0 {
            return Self(0);
        }
        Self::from_basis_points((fraction.min(1.0) * 10_000.0).round() as u32)
    }

    /// Basis points.
    pub fn basis_points(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for RelevanceWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_parse_round_trip(h in -1_000_000_000i64..1_000_000_000) {
            let q = Quantity::from_hundredths(h);
            prop_assert_eq!(Quantity::parse(&q.to_string()).unwrap(), q);
        }

        #[test]
        fn percent_increase_never_decreases_positive_values(
            h in 0i64..10_000_000,
            pct in 0u32..500,
        ) {
            let q = Quantity::from_hundredths(h);
            prop_assert!(q.increased_by_percent(pct) >= q);
        }
    }
}
