//! Merkle root over an ordered sequence of transaction hashes.

use denaro_crypto::sha256_pair;
use denaro_types::TxHash;

/// Pairwise SHA-256 tree. An odd node at the end of a level is carried up
/// unchanged. Order matters: permuting the hashes changes the root.
///
/// The empty sequence has the all-zero root.
pub fn merkle_root(hashes: &[TxHash]) -> [u8; 32] {
    let mut level: Vec<[u8; 32]> = hashes.iter().map(|h| *h.as_bytes()).collect();
    if level.is_empty() {
        return [0u8; 32];
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair.get(1) {
                Some(right) => sha256_pair(&pair[0], right),
                None => pair[0],
            })
            .collect();
    }
    level[0]
}
