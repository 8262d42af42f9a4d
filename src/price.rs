use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Largest amount a NUMERIC(10, 2) column can hold, in cents.
pub const MAX_CENTS: i64 = 9_999_999_999;

/// Money with two-place fixed precision, held as whole cents.
///
/// Travels over JSON as a decimal string (`"5.50"`). Integer JSON numbers are
/// read as whole currency units; floating point input is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,

    #[error("price must be a non-negative decimal with at most two fractional digits")]
    Malformed,

    #[error("price must be between 0.00 and 99999999.99")]
    OutOfRange,
}

impl Price {
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if !(0..=MAX_CENTS).contains(&cents) {
            return Err(PriceError::OutOfRange);
        }
        Ok(Self(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((_, "")) => return Err(PriceError::Malformed),
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || frac.len() > 2 || !digits(whole) || !digits(frac) {
            return Err(PriceError::Malformed);
        }

        let whole: i64 = whole.parse().map_err(|_| PriceError::OutOfRange)?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| PriceError::Malformed)? * 10,
            _ => frac.parse().map_err(|_| PriceError::Malformed)?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or(PriceError::OutOfRange)?;
        Self::from_cents(cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<i64> for Price {
    type Error = PriceError;

    fn try_from(cents: i64) -> Result<Self, Self::Error> {
        Self::from_cents(cents)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct PriceVisitor;

impl de::Visitor<'_> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal price string such as \"5.50\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        i64::try_from(v)
            .ok()
            .and_then(|units| units.checked_mul(100))
            .ok_or_else(|| E::custom(PriceError::OutOfRange))
            .and_then(|cents| Price::from_cents(cents).map_err(E::custom))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        if v < 0 {
            return Err(E::custom(PriceError::OutOfRange));
        }
        self.visit_u64(v as u64)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_point_strings() {
        assert_eq!("5.50".parse::<Price>().unwrap().cents(), 550);
        assert_eq!("5.5".parse::<Price>().unwrap().cents(), 550);
        assert_eq!("12".parse::<Price>().unwrap().cents(), 1200);
        assert_eq!("0.07".parse::<Price>().unwrap().cents(), 7);
        assert_eq!("99999999.99".parse::<Price>().unwrap().cents(), MAX_CENTS);
    }

    #[test]
    fn rejects_bad_strings() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
        assert_eq!("5.".parse::<Price>(), Err(PriceError::Malformed));
        assert_eq!(".5".parse::<Price>(), Err(PriceError::Malformed));
        assert_eq!("5.555".parse::<Price>(), Err(PriceError::Malformed));
        assert_eq!("-1.00".parse::<Price>(), Err(PriceError::Malformed));
        assert_eq!("1e3".parse::<Price>(), Err(PriceError::Malformed));
        assert_eq!("100000000.00".parse::<Price>(), Err(PriceError::OutOfRange));
    }

    #[test]
    fn displays_two_places() {
        assert_eq!(Price::from_cents(550).unwrap().to_string(), "5.50");
        assert_eq!(Price::from_cents(7).unwrap().to_string(), "0.07");
        assert_eq!(Price::default().to_string(), "0.00");
    }

    #[test]
    fn json_accepts_strings_and_integers_only() {
        let p: Price = serde_json::from_str("\"3.20\"").unwrap();
        assert_eq!(p.cents(), 320);
        let p: Price = serde_json::from_str("4").unwrap();
        assert_eq!(p.cents(), 400);
        assert!(serde_json::from_str::<Price>("4.25").is_err());
        assert!(serde_json::from_str::<Price>("-4").is_err());
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"4.00\"");
    }
}
