//! Denaro transactions and their canonical wire codec.
//!
//! - **Transaction**: spends committed outputs, one signature per distinct input key
//! - **CoinbaseTransaction**: zero inputs, one output paying the block reward
//! - **BlockContent**: the fixed 106-byte header whose hash is the proof of work
//! - **merkle_root**: ordered commitment to a block's transaction hashes

mod codec;
pub mod block_content;
pub mod coinbase;
pub mod error;
pub mod merkle;
pub mod transaction;

pub use block_content::{BlockContent, BLOCK_CONTENT_LEN};
pub use codec::decode_hex;
pub use coinbase::CoinbaseTransaction;
pub use error::{DecodeError, TransactionError};
pub use merkle::merkle_root;
pub use transaction::{Transaction, TransactionInput, TransactionOutput, TX_VERSION};

use codec::Reader;
use denaro_types::{Address, Amount, TxHash};

/// Any transaction as it appears in a committed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerTransaction {
    Regular(Transaction),
    Coinbase(CoinbaseTransaction),
}

impl LedgerTransaction {
    /// Decode either form. A zero input count marks a coinbase.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let version = r.u8()?;
        if version != TX_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let tx = match r.u8()? {
            0 => Self::Coinbase(CoinbaseTransaction::read_body(&mut r)?),
            n => Self::Regular(Transaction::read_body(version, n, &mut r)?),
        };
        r.finish()?;
        Ok(tx)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        Self::from_bytes(&decode_hex(s)?)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Regular(tx) => tx.to_bytes(),
            Self::Coinbase(tx) => tx.to_bytes(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn hash(&self) -> TxHash {
        match self {
            Self::Regular(tx) => tx.hash(),
            Self::Coinbase(tx) => tx.hash(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, Self::Coinbase(_))
    }

    /// `(address, amount)` for each output in order.
    pub fn outputs(&self) -> Vec<(Address, Amount)> {
        match self {
            Self::Regular(tx) => tx.outputs.iter().map(|o| (o.address(), o.amount)).collect(),
            Self::Coinbase(tx) => vec![(tx.address(), tx.amount())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denaro_crypto::keypair_from_seed;
    use denaro_types::{BlockHash, OutPoint};

    #[test]
    fn dispatches_on_input_count() {
        let k = keypair_from_seed(&[1; 32]);
        let coinbase = CoinbaseTransaction::new(BlockHash::new([9; 32]), k.public, Amount::from_coins(100));
        let decoded = LedgerTransaction::from_hex(&coinbase.to_hex()).unwrap();
        assert!(decoded.is_coinbase());
        assert_eq!(decoded.hash(), coinbase.hash());

        let mut tx = Transaction::new(
            vec![TransactionInput::unsigned(OutPoint::new(coinbase.hash(), 0), k.public)],
            vec![TransactionOutput::new(k.public, Amount::from_coins(1))],
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(&k)).unwrap();
        let decoded = LedgerTransaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(decoded, LedgerTransaction::Regular(tx));
    }

    #[test]
    fn coinbase_with_two_outputs_rejected() {
        let k = keypair_from_seed(&[1; 32]);
        let mut bytes = CoinbaseTransaction::new(BlockHash::ZERO, k.public, Amount::new(1)).to_bytes();
        bytes[34] = 2;
        assert_eq!(LedgerTransaction::from_bytes(&bytes), Err(DecodeError::CoinbaseShape(2)));
    }

    #[test]
    fn regular_decoder_refuses_coinbase_bytes() {
        let k = keypair_from_seed(&[1; 32]);
        let bytes = CoinbaseTransaction::new(BlockHash::ZERO, k.public, Amount::new(1)).to_bytes();
        assert!(Transaction::from_bytes(&bytes).is_err());
    }
}
