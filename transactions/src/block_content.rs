//! The 106-byte block header miners grind on.

use crate::codec::{decode_hex, Reader};
use crate::error::DecodeError;
use denaro_crypto::{derive_address, hash_block};
use denaro_types::{Address, BlockHash, Difficulty, PublicKey};

pub const BLOCK_CONTENT_LEN: usize = 106;

/// `previous_hash | miner | merkle_root | timestamp:u32 | difficulty:u16 | nonce:u32`.
///
/// The block hash is the SHA-256 of exactly these bytes and doubles as the
/// proof-of-work hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContent {
    pub previous_hash: BlockHash,
    pub miner: PublicKey,
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub difficulty: Difficulty,
    pub nonce: u32,
}

impl BlockContent {
    pub fn to_bytes(&self) -> [u8; BLOCK_CONTENT_LEN] {
        let mut out = [0u8; BLOCK_CONTENT_LEN];
        out[0..32].copy_from_slice(self.previous_hash.as_bytes());
        out[32..64].copy_from_slice(self.miner.as_bytes());
        out[64..96].copy_from_slice(&self.merkle_root);
        out[96..100].copy_from_slice(&self.timestamp.to_le_bytes());
        out[100..102].copy_from_slice(&self.difficulty.tenths().to_le_bytes());
        out[102..106].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != BLOCK_CONTENT_LEN {
            return Err(DecodeError::ContentLength {
                expected: BLOCK_CONTENT_LEN,
                actual: bytes.len(),
            });
        }
        let mut r = Reader::new(bytes);
        let content = Self {
            previous_hash: BlockHash::new(r.array()?),
            miner: PublicKey(r.array()?),
            merkle_root: r.array()?,
            timestamp: r.u32()?,
            difficulty: Difficulty::from_tenths(r.u16()?),
            nonce: r.u32()?,
        };
        r.finish()?;
        Ok(content)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        Self::from_bytes(&decode_hex(s)?)
    }

    pub fn hash(&self) -> BlockHash {
        hash_block(&self.to_bytes())
    }

    pub fn miner_address(&self) -> Address {
        derive_address(&self.miner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BlockContent {
        BlockContent {
            previous_hash: BlockHash::new([1; 32]),
            miner: PublicKey([2; 32]),
            merkle_root: [3; 32],
            timestamp: 1_700_000_000,
            difficulty: Difficulty::from_tenths(65),
            nonce: 42,
        }
    }

    #[test]
    fn roundtrip() {
        let c = sample();
        assert_eq!(BlockContent::from_hex(&c.to_hex()).unwrap(), c);
    }

    #[test]
    fn nonce_changes_hash() {
        let a = sample();
        let b = BlockContent { nonce: 43, ..sample() };
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(
            BlockContent::from_bytes(&[0u8; 105]),
            Err(DecodeError::ContentLength {
                expected: 106,
                actual: 105
            })
        );
    }
}
