//! Unspent output set.

use crate::records::UnspentOutput;
use crate::StoreError;
use denaro_types::{Address, Amount, OutPoint};

pub trait UtxoStore {
    /// Every unspent output paying `address`, ordered by outpoint.
    fn get_unspent(&self, address: &Address) -> Result<Vec<UnspentOutput>, StoreError>;

    fn get_unspent_output(&self, outpoint: &OutPoint) -> Result<Option<UnspentOutput>, StoreError>;

    /// The whole unspent set, ordered by `(tx_hash, index)`.
    fn unspent_outpoints(&self) -> Result<Vec<OutPoint>, StoreError>;

    /// Committed balance of `address`.
    fn get_balance(&self, address: &Address) -> Result<Amount, StoreError> {
        let outputs = self.get_unspent(address)?;
        Amount::checked_sum(outputs.iter().map(|o| o.amount))
            .ok_or_else(|| StoreError::Corruption(format!("balance overflow for {address}")))
    }
}
