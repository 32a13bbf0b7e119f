//! Address type with the `dnr_` prefix.

use crate::error::DenaroError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A denaro address: `dnr_` + base32(public key) + base32(checksum).
///
/// Construction only checks the shape. Checksum verification and the
/// public key round trip live in `denaro_crypto::decode_address`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const PREFIX: &'static str = "dnr_";

    /// Base32 characters encoding the 32-byte key.
    pub const KEY_CHARS: usize = 52;

    /// Base32 characters encoding the 5-byte checksum.
    pub const CHECKSUM_CHARS: usize = 8;

    pub const LEN: usize = Self::PREFIX.len() + Self::KEY_CHARS + Self::CHECKSUM_CHARS;

    pub const ALPHABET: &'static [u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

    pub fn parse(raw: impl Into<String>) -> Result<Self, DenaroError> {
        let s = raw.into();
        let body = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| DenaroError::InvalidAddress(s.clone()))?;
        if s.len() != Self::LEN || !body.bytes().all(|b| Self::ALPHABET.contains(&b)) {
            return Err(DenaroError::InvalidAddress(s));
        }
        Ok(Self(s))
    }

    /// Wrap an already encoded address. The caller guarantees the shape.
    pub fn new_unchecked(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = DenaroError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = DenaroError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        format!("dnr_{}", "1".repeat(Address::KEY_CHARS + Address::CHECKSUM_CHARS))
    }

    #[test]
    fn parse_checks_prefix_length_and_alphabet() {
        assert!(Address::parse(sample()).is_ok());
        assert!(Address::parse(sample().replace("dnr_", "xyz_")).is_err());
        assert!(Address::parse("dnr_111").is_err());
        let mut bad = sample();
        bad.pop();
        bad.push('2');
        assert!(Address::parse(bad).is_err());
    }

    #[test]
    fn serde_goes_through_parse() {
        let json = format!("\"{}\"", sample());
        let addr: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr.as_str(), sample());
        assert!(serde_json::from_str::<Address>("\"nope\"").is_err());
    }
}
