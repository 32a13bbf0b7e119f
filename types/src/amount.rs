//! Denaro amounts.
//!
//! Amounts are fixed-point integers with six fractional digits. The smallest unit
//! is one millionth of a denaro; the wire format carries the scaled integer.

use crate::error::DenaroError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Number of fractional digits.
pub const DECIMALS: u32 = 6;

/// Smallest units per whole denaro.
pub const UNIT: u64 = 10u64.pow(DECIMALS);

/// An exact denaro amount stored as scaled units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Whole denari, `Amount::from_coins(3)` is `3.000000`.
    pub const fn from_coins(coins: u64) -> Self {
        Self(coins * UNIT)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Sum an iterator of amounts, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(iter: I) -> Option<Self> {
        iter.into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / UNIT, self.0 % UNIT)
    }
}

impl FromStr for Amount {
    type Err = DenaroError;

    /// Parses `"12"`, `"0.5"` or `"3.141592"`. More than six fractional digits is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DenaroError::InvalidAmount(s.to_string());
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > DECIMALS as usize
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut frac_units: u64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid())?
        };
        frac_units *= 10u64.pow(DECIMALS - frac.len() as u32);
        whole
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_fraction() {
        assert_eq!(Amount::new(1_500_000).to_string(), "1.500000");
        assert_eq!(Amount::new(7).to_string(), "0.000007");
        assert_eq!(Amount::from_coins(100).to_string(), "100.000000");
    }

    #[test]
    fn parse_decimal_forms() {
        assert_eq!("4".parse::<Amount>().unwrap(), Amount::from_coins(4));
        assert_eq!("2.5".parse::<Amount>().unwrap(), Amount::new(2_500_000));
        assert_eq!(".25".parse::<Amount>().unwrap(), Amount::new(250_000));
        assert_eq!("0.000001".parse::<Amount>().unwrap(), Amount::new(1));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Amount>().is_err());
        assert!(".".parse::<Amount>().is_err());
        assert!("1.0000001".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
        assert!("1e5".parse::<Amount>().is_err());
        assert!("99999999999999999999".parse::<Amount>().is_err());
    }

    #[test]
    fn checked_sum_detects_overflow() {
        let parts = [Amount::new(u64::MAX), Amount::new(1)];
        assert!(Amount::checked_sum(parts).is_none());
        let parts = [Amount::from_coins(1), Amount::new(500_000)];
        assert_eq!(Amount::checked_sum(parts), Some(Amount::new(1_500_000)));
    }
}
