//! Hashing for blocks, transactions and address checksums.

use blake2::digest::consts::U32;
use blake2::Blake2b;
use denaro_types::{BlockHash, TxHash};
use sha2::{Digest, Sha256};

type Blake2b256 = Blake2b<U32>;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 over `left || right`, used for merkle nodes.
pub fn sha256_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Blake2b-256, only used for address checksums.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// Hash the 106-byte block content to produce its `BlockHash`.
pub fn hash_block(content: &[u8]) -> BlockHash {
    BlockHash::new(sha256(content))
}

/// Hash a serialized transaction to produce its `TxHash`.
pub fn hash_transaction(tx_bytes: &[u8]) -> TxHash {
    TxHash::new(sha256(tx_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn pair_is_concatenation() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let mut joined = a.to_vec();
        joined.extend_from_slice(&b);
        assert_eq!(sha256_pair(&a, &b), sha256(&joined));
        assert_ne!(sha256_pair(&a, &b), sha256_pair(&b, &a));
    }

    #[test]
    fn block_and_tx_hashes_use_sha256() {
        assert_eq!(hash_block(b"x").as_bytes(), &sha256(b"x"));
        assert_eq!(hash_transaction(b"y").as_bytes(), &sha256(b"y"));
    }

    #[test]
    fn blake2b_differs_from_sha256() {
        assert_ne!(blake2b_256(b"denaro"), sha256(b"denaro"));
    }
}
