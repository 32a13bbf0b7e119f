//! Composite key layouts.
//!
//! Integers are big-endian so LMDB's lexicographic order is numeric order.

use denaro_types::{Address, BlockHash, OutPoint, TxHash};

pub(crate) fn height(h: u64) -> [u8; 8] {
    h.to_be_bytes()
}

/// `tx_hash | index`
pub(crate) fn outpoint(op: &OutPoint) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[..32].copy_from_slice(op.tx_hash.as_bytes());
    key[32] = op.index;
    key
}

pub(crate) fn parse_outpoint(key: &[u8]) -> Option<OutPoint> {
    let (hash, index) = key.split_first_chunk::<32>()?;
    match index {
        [index] => Some(OutPoint::new(TxHash::new(*hash), *index)),
        _ => None,
    }
}

/// `address | tx_hash | index`
pub(crate) fn address_utxo(address: &Address, op: &OutPoint) -> Vec<u8> {
    let mut key = address.as_str().as_bytes().to_vec();
    key.extend_from_slice(&outpoint(op));
    key
}

/// `address | height | position | tx_hash`, so a reverse prefix scan is newest first.
pub(crate) fn address_tx(address: &Address, height: u64, position: u16, tx: &TxHash) -> Vec<u8> {
    let mut key = address.as_str().as_bytes().to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(&position.to_be_bytes());
    key.extend_from_slice(tx.as_bytes());
    key
}

/// `block_hash | position`
pub(crate) fn block_tx(block: &BlockHash, position: u16) -> [u8; 34] {
    let mut key = [0u8; 34];
    key[..32].copy_from_slice(block.as_bytes());
    key[32..].copy_from_slice(&position.to_be_bytes());
    key
}

pub(crate) fn hash32(bytes: &[u8]) -> Option<[u8; 32]> {
    bytes.try_into().ok()
}

pub(crate) fn tail_hash(key: &[u8]) -> Option<[u8; 32]> {
    key.len()
        .checked_sub(32)
        .and_then(|start| hash32(&key[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outpoint_key_parses_back() {
        let op = OutPoint::new(TxHash::new([7; 32]), 3);
        assert_eq!(parse_outpoint(&outpoint(&op)), Some(op));
        assert_eq!(parse_outpoint(&[0; 32]), None);
        assert_eq!(parse_outpoint(&[0; 34]), None);
    }
}
