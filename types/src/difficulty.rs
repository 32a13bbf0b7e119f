//! Proof-of-work difficulty with one fractional digit.

use crate::error::DenaroError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty in tenths: `Difficulty::from_tenths(65)` is `6.5`.
///
/// The integer part counts leading zero hex digits of a valid proof hash,
/// the tenth narrows the digit after them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Difficulty(u16);

impl Difficulty {
    pub const ZERO: Self = Self(0);

    /// Hard ceiling: 64 hex digits in a SHA-256 hash.
    pub const MAX: Self = Self(640);

    pub const fn from_tenths(tenths: u16) -> Self {
        Self(tenths)
    }

    pub fn tenths(&self) -> u16 {
        self.0
    }

    /// Leading hex digits that must be zero.
    pub fn whole(&self) -> u16 {
        self.0 / 10
    }

    pub fn fraction(&self) -> u16 {
        self.0 % 10
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole(), self.fraction())
    }
}

impl FromStr for Difficulty {
    type Err = DenaroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DenaroError::InvalidDifficulty(s.to_string());
        let (whole, frac) = s.trim().split_once('.').unwrap_or((s.trim(), "0"));
        if frac.len() != 1 {
            return Err(invalid());
        }
        let whole: u16 = whole.parse().map_err(|_| invalid())?;
        let frac: u16 = frac.parse().map_err(|_| invalid())?;
        let tenths = whole
            .checked_mul(10)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        if tenths > Self::MAX.0 {
            return Err(invalid());
        }
        Ok(Self(tenths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let d = Difficulty::from_tenths(65);
        assert_eq!(d.to_string(), "6.5");
        assert_eq!("6.5".parse::<Difficulty>().unwrap(), d);
        assert_eq!("6".parse::<Difficulty>().unwrap(), Difficulty::from_tenths(60));
        assert!("6.55".parse::<Difficulty>().is_err());
        assert!("65.0".parse::<Difficulty>().is_err());
    }
}
