//! Rows persisted by the ledger store.

use denaro_types::{Address, Amount, BlockHash, Difficulty, OutPoint, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: BlockHash,
    pub height: u64,
    pub previous_hash: BlockHash,
    /// The raw 106-byte header.
    pub content: Vec<u8>,
    pub miner: Address,
    pub nonce: u32,
    pub difficulty: Difficulty,
    pub timestamp: Timestamp,
    /// Base reward plus fees, as paid by the coinbase.
    pub reward: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub block_hash: BlockHash,
    pub bytes: Vec<u8>,
    pub inputs_addresses: Vec<Address>,
    pub outputs_addresses: Vec<Address>,
    pub fees: Amount,
    pub is_coinbase: bool,
}

/// An output no committed transaction spends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub tx_hash: TxHash,
    pub index: u8,
    pub address: Address,
    pub amount: Amount,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_hash, self.index)
    }
}

/// Everything one accepted block changes, applied all-or-nothing.
#[derive(Clone, Debug)]
pub struct BlockCommit {
    pub block: BlockRecord,
    /// Coinbase first, then block order.
    pub transactions: Vec<TransactionRecord>,
    /// Outpoints consumed by the block's transactions.
    pub spent: Vec<OutPoint>,
    /// Outputs created by the block and not spent inside it.
    pub created: Vec<UnspentOutput>,
}

/// How RPC callers name a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockId {
    Height(u64),
    Hash(BlockHash),
}

impl FromStr for BlockId {
    type Err = denaro_types::DenaroError;

    /// Decimal digits are a height, anything else must be a block hash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.len() < 20 && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse()
                .map(Self::Height)
                .map_err(|_| denaro_types::DenaroError::InvalidHash(s.to_string()))
        } else {
            BlockHash::from_hex(s).map(Self::Hash)
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height(h) => write!(f, "{h}"),
            Self::Hash(h) => write!(f, "{h}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_parsing() {
        assert_eq!("42".parse::<BlockId>().unwrap(), BlockId::Height(42));
        let hash = BlockHash::new([7; 32]);
        assert_eq!(hash.to_hex().parse::<BlockId>().unwrap(), BlockId::Hash(hash));
        assert!("not-a-block".parse::<BlockId>().is_err());
        assert!("".parse::<BlockId>().is_err());
    }
}
