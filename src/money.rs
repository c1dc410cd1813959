//! USD amounts held as integer cents.
//!
//! Budgets are compared against sums of many small charges, so amounts never
//! pass through floating point once parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("Amount has more than two decimal places: {0}")]
    TooPrecise(String),

    #[error("Amount is not finite: {0}")]
    NotFinite(String),
}

/// A dollar amount in whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd(i64);

impl Usd {
    pub const ZERO: Usd = Usd(0);

    pub const fn from_cents(cents: i64) -> Self {
        Usd(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Convert a float dollar amount, rounding to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Result<Self, ParseError> {
        if !dollars.is_finite() {
            return Err(ParseError::NotFinite(dollars.to_string()));
        }
        Ok(Usd((dollars * 100.0).round() as i64))
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, rhs: Usd) -> Usd {
        Usd((self.0 - rhs.0).max(0))
    }

    pub fn times(self, n: u32) -> Usd {
        Usd(self.0.saturating_mul(i64::from(n)))
    }
}

impl Add for Usd {
    type Output = Usd;

    fn add(self, rhs: Usd) -> Usd {
        Usd(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Usd {
    fn add_assign(&mut self, rhs: Usd) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Usd {
    type Output = Usd;

    fn sub(self, rhs: Usd) -> Usd {
        Usd(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Usd>>(iter: I) -> Usd {
        iter.fold(Usd::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Usd> for Usd {
    fn sum<I: Iterator<Item = &'a Usd>>(iter: I) -> Usd {
        iter.copied().sum()
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Usd {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest).replace(',', "");

        if rest.is_empty() {
            return Err(ParseError::InvalidFormat(s.to_string()));
        }

        let (whole, frac) = match rest.split_once('.') {
            Some((w, f)) => (w, f),
            None => (rest.as_str(), ""),
        };

        if frac.len() > 2 {
            return Err(ParseError::TooPrecise(s.to_string()));
        }
        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) || (whole.is_empty() && frac.is_empty()) {
            return Err(ParseError::InvalidFormat(s.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ParseError::InvalidFormat(s.to_string()))?
        };
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(|| ParseError::InvalidFormat(s.to_string()))?;

        Ok(Usd(if negative { -cents } else { cents }))
    }
}

impl Serialize for Usd {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Usd {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct UsdVisitor;

        impl<'de> serde::de::Visitor<'de> for UsdVisitor {
            type Value = Usd;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a dollar amount as number (e.g. 1.5) or string (e.g. \"$1.50\")")
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Usd::from_dollars(v).map_err(serde::de::Error::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.checked_mul(100)
                    .map(Usd)
                    .ok_or_else(|| serde::de::Error::custom("amount out of range"))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .map(Usd)
                    .ok_or_else(|| serde::de::Error::custom("amount out of range"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<Usd>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(UsdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_dollar_sign() {
        assert_eq!("1.50".parse::<Usd>().unwrap(), Usd::from_cents(150));
        assert_eq!("$10".parse::<Usd>().unwrap(), Usd::from_cents(1000));
        assert_eq!("0.1".parse::<Usd>().unwrap(), Usd::from_cents(10));
        assert_eq!(".25".parse::<Usd>().unwrap(), Usd::from_cents(25));
        assert_eq!("$1,250.00".parse::<Usd>().unwrap(), Usd::from_cents(125_000));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Usd>().is_err());
        assert!("abc".parse::<Usd>().is_err());
        assert!("$".parse::<Usd>().is_err());
        assert!(matches!(
            "1.005".parse::<Usd>(),
            Err(ParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Usd::from_cents(150).to_string(), "$1.50");
        assert_eq!(Usd::from_cents(5).to_string(), "$0.05");
        assert_eq!(Usd::from_cents(-30).to_string(), "-$0.30");
    }

    #[test]
    fn test_float_rounding_is_exact_for_cents() {
        let total: Usd = [0.1, 0.1, 0.1]
            .iter()
            .map(|d| Usd::from_dollars(*d).unwrap())
            .sum();
        assert_eq!(total, Usd::from_cents(30));
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let a: Usd = serde_json::from_str("0.4").unwrap();
        let b: Usd = serde_json::from_str("3").unwrap();
        let c: Usd = serde_json::from_str("\"$2.25\"").unwrap();
        assert_eq!(a, Usd::from_cents(40));
        assert_eq!(b, Usd::from_cents(300));
        assert_eq!(c, Usd::from_cents(225));

        assert_eq!(serde_json::to_string(&Usd::from_cents(125)).unwrap(), "1.25");
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let a = Usd::from_cents(100);
        assert_eq!(a.saturating_sub(Usd::from_cents(250)), Usd::ZERO);
        assert_eq!(a.saturating_sub(Usd::from_cents(30)), Usd::from_cents(70));
    }
}
