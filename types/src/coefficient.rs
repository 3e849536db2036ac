//! Participation coefficient: a unit's share of total property ownership.
//!
//! Coefficients are represented as fixed-point integers (micro-units, six
//! decimal places) so that summing hundreds of them is exact. Whether a
//! property expresses shares as fractions (`0.0125`) or percentages (`1.25`)
//! does not matter: quorum math only ever divides one sum by another.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places carried by a [`Coefficient`].
pub const COEFFICIENT_DECIMALS: u32 = 6;

/// Raw micro-units per whole coefficient unit.
pub const COEFFICIENT_SCALE: u64 = 10u64.pow(COEFFICIENT_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCoefficientError {
    #[error("coefficient is empty")]
    Empty,

    #[error("coefficient must be a non-negative decimal: {0:?}")]
    Invalid(String),

    #[error("coefficient out of range: {0:?}")]
    OutOfRange(String),
}

/// A non-negative fixed-point decimal with six fractional digits.
///
/// Inputs with more digits are rounded half-to-even to the nearest
/// micro-unit, whether they arrive as text or as a JSON number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coefficient(u64);

impl Coefficient {
    pub const ZERO: Self = Self(0);

    /// Build from raw micro-units (`1_000_000` == `1.0`).
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn micros(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn from_decimal(value: Decimal) -> Result<Self, ParseCoefficientError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ParseCoefficientError::Invalid(value.to_string()));
        }
        value
            .round_dp_with_strategy(COEFFICIENT_DECIMALS, RoundingStrategy::MidpointNearestEven)
            .checked_mul(Decimal::from(COEFFICIENT_SCALE))
            .and_then(|micros| micros.to_u64())
            .map(Self)
            .ok_or_else(|| ParseCoefficientError::OutOfRange(value.to_string()))
    }

    /// Exact decimal value, six fractional digits.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), COEFFICIENT_DECIMALS)
    }

    /// Convert from a float through its shortest decimal text, so `0.1`
    /// means one tenth rather than the nearest binary fraction.
    ///
    /// Negative, NaN and infinite inputs are rejected.
    pub fn from_f64(value: f64) -> Result<Self, ParseCoefficientError> {
        if !value.is_finite() {
            return Err(ParseCoefficientError::Invalid(value.to_string()));
        }
        value.to_string().parse()
    }

    /// Lossy conversion for display.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / COEFFICIENT_SCALE as f64
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl Add for Coefficient {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Coefficient {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl FromStr for Coefficient {
    type Err = ParseCoefficientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseCoefficientError::Empty);
        }
        let value = Decimal::from_str(s).map_err(|_| ParseCoefficientError::Invalid(s.to_string()))?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_decimal(), f)
    }
}

impl Serialize for Coefficient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Accepts either a JSON number (`0.25`) or a decimal string (`"0.25"`);
/// both are read as decimal text.
impl<'de> Deserialize<'de> for Coefficient {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Coefficient::from_f64(n).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings_exactly() {
        assert_eq!("0.6".parse::<Coefficient>().unwrap().micros(), 600_000);
        assert_eq!("12.345678".parse::<Coefficient>().unwrap().micros(), 12_345_678);
        assert_eq!("3".parse::<Coefficient>().unwrap().micros(), 3_000_000);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Coefficient>(), Err(ParseCoefficientError::Empty));
        assert!(matches!(
            "-1".parse::<Coefficient>(),
            Err(ParseCoefficientError::Invalid(_))
        ));
        assert!(matches!(
            "1.2.3".parse::<Coefficient>(),
            Err(ParseCoefficientError::Invalid(_))
        ));
    }

    #[test]
    fn display_pads_fraction() {
        assert_eq!(Coefficient::from_micros(1_050_000).to_string(), "1.050000");
        assert_eq!(Coefficient::ZERO.to_string(), "0.000000");
    }

    #[test]
    fn summing_many_small_shares_is_exact() {
        // 300 units of 1/300 rounded to micro-units: float summation of 0.003333
        // drifts, integer summation does not.
        let share: Coefficient = "0.003333".parse().unwrap();
        let total: Coefficient = std::iter::repeat(share).take(300).sum();
        assert_eq!(total.micros(), 999_900);
    }

    #[test]
    fn extra_digits_round_half_to_even() {
        assert_eq!("0.0833333".parse::<Coefficient>().unwrap().micros(), 83_333);
        assert_eq!("0.0000005".parse::<Coefficient>().unwrap().micros(), 0);
        assert_eq!("0.0000015".parse::<Coefficient>().unwrap().micros(), 2);
    }

    #[test]
    fn text_and_number_inputs_agree() {
        for raw in ["0.0833333", "0.1", "0.0000015", "12.5"] {
            let from_text: Coefficient = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
            let from_number: Coefficient = serde_json::from_str(raw).unwrap();
            assert_eq!(from_text, from_number, "{raw}");
        }
        assert_eq!(Coefficient::from_f64(0.1).unwrap().micros(), 100_000);
        assert!(Coefficient::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn deserializes_from_number_or_string() {
        let from_num: Coefficient = serde_json::from_str("0.4").unwrap();
        let from_str: Coefficient = serde_json::from_str("\"0.4\"").unwrap();
        assert_eq!(from_num, from_str);
        assert_eq!(from_num.micros(), 400_000);
        assert!(serde_json::from_str::<Coefficient>("-0.4").is_err());
    }
}
