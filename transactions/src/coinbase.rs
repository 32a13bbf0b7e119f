//! Coinbase: the zero-input transaction paying the block reward.

use crate::codec::Reader;
use crate::error::DecodeError;
use crate::transaction::{TransactionOutput, TX_VERSION};
use denaro_crypto::hash_transaction;
use denaro_types::{Address, Amount, BlockHash, PublicKey, TxHash};

/// Wire layout: `version | 0 | block_hash | 1 | public_key | amount`.
///
/// The block hash makes every coinbase hash unique even when the same
/// miner claims the same reward twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinbaseTransaction {
    pub block_hash: BlockHash,
    pub output: TransactionOutput,
}

impl CoinbaseTransaction {
    pub fn new(block_hash: BlockHash, recipient: PublicKey, amount: Amount) -> Self {
        Self {
            block_hash,
            output: TransactionOutput::new(recipient, amount),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(75);
        out.push(TX_VERSION);
        out.push(0);
        out.extend_from_slice(self.block_hash.as_bytes());
        out.push(1);
        self.output.write(&mut out);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn hash(&self) -> TxHash {
        hash_transaction(&self.to_bytes())
    }

    pub fn amount(&self) -> Amount {
        self.output.amount
    }

    pub fn address(&self) -> Address {
        self.output.address()
    }

    pub(crate) fn read_body(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let block_hash = BlockHash::new(r.array()?);
        match r.u8()? {
            1 => {}
            n => return Err(DecodeError::CoinbaseShape(n)),
        }
        let output = TransactionOutput::read(r)?;
        Ok(Self { block_hash, output })
    }
}
