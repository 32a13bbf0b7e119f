//! Address derivation from public keys.
//!
//! Format: `dnr_` + base32(public_key, 52 chars) + base32(checksum, 8 chars).
//! The checksum is the first 5 bytes of Blake2b-256(public_key).

use crate::hash::blake2b_256;
use denaro_types::{Address, DenaroError, PublicKey};

const ALPHABET: &[u8; 32] = Address::ALPHABET;

/// ASCII byte to 5-bit value, 0xFF for characters outside the alphabet.
const DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

fn encode_base32(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1F) as usize] as char);
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(ALPHABET[((acc << (5 - bits)) & 0x1F) as usize] as char);
    }
    out
}

fn decode_base32<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    let mut acc: u32 = 0;
    let mut bits = 0;
    let mut pos = 0;
    for c in s.bytes() {
        let val = *DECODE.get(c as usize)?;
        if val == 0xFF {
            return None;
        }
        acc = (acc << 5) | u32::from(val);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            if pos == N {
                return None;
            }
            out[pos] = (acc >> bits) as u8;
            pos += 1;
        }
        acc &= (1 << bits) - 1;
    }
    (pos == N).then_some(out)
}

fn checksum(public_key: &[u8; 32]) -> [u8; 5] {
    let digest = blake2b_256(public_key);
    [digest[0], digest[1], digest[2], digest[3], digest[4]]
}

pub fn derive_address(public_key: &PublicKey) -> Address {
    Address::new_unchecked(format!(
        "{}{}{}",
        Address::PREFIX,
        encode_base32(public_key.as_bytes()),
        encode_base32(&checksum(public_key.as_bytes()))
    ))
}

/// Recover the public key behind an address, verifying the checksum.
pub fn decode_address(address: &Address) -> Result<PublicKey, DenaroError> {
    let invalid = || DenaroError::InvalidAddress(address.to_string());
    let body = address
        .as_str()
        .strip_prefix(Address::PREFIX)
        .ok_or_else(invalid)?;
    if body.len() != Address::KEY_CHARS + Address::CHECKSUM_CHARS {
        return Err(invalid());
    }
    let (key_part, sum_part) = body.split_at(Address::KEY_CHARS);
    let key: [u8; 32] = decode_base32(key_part).ok_or_else(invalid)?;
    let sum: [u8; 5] = decode_base32(sum_part).ok_or_else(invalid)?;
    // Non-zero padding bits would give one key two spellings.
    if sum != checksum(&key) || encode_base32(&key) != key_part {
        return Err(invalid());
    }
    Ok(PublicKey(key))
}

/// Parse and checksum-verify an address string.
pub fn validate_address(raw: &str) -> Result<Address, DenaroError> {
    let address = Address::parse(raw)?;
    decode_address(&address)?;
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn derive_then_decode() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        assert!(addr.as_str().starts_with("dnr_"));
        assert_eq!(addr.as_str().len(), Address::LEN);
        assert_eq!(decode_address(&addr).unwrap(), kp.public);
    }

    #[test]
    fn derivation_is_deterministic() {
        let kp = keypair_from_seed(&[7u8; 32]);
        assert_eq!(derive_address(&kp.public), derive_address(&kp.public));
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let addr = derive_address(&keypair_from_seed(&[8u8; 32]).public);
        let mut bad = addr.to_string();
        let last = bad.pop().unwrap();
        bad.push(if last == '1' { '3' } else { '1' });
        assert!(validate_address(&bad).is_err());
    }

    #[test]
    fn malformed_strings_rejected() {
        assert!(validate_address("dnr_short").is_err());
        assert!(validate_address("").is_err());
        assert!(validate_address(&"1".repeat(Address::LEN)).is_err());
    }

    #[test]
    fn base32_roundtrip() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x42];
        let encoded = encode_base32(&data);
        assert_eq!(encoded.len(), 8);
        assert_eq!(decode_base32::<5>(&encoded), Some(data));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_key_survives_its_address(bytes in any::<[u8; 32]>()) {
                let key = PublicKey(bytes);
                let addr = derive_address(&key);
                prop_assert_eq!(validate_address(addr.as_str()).unwrap(), addr.clone());
                prop_assert_eq!(decode_address(&addr).unwrap(), key);
            }
        }
    }
}
