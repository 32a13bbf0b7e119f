//! Confirmed-transaction index.

use crate::records::TransactionRecord;
use crate::StoreError;
use denaro_types::{Address, BlockHash, TxHash};

pub trait TransactionStore {
    fn get_transaction(&self, hash: &TxHash) -> Result<Option<TransactionRecord>, StoreError>;

    fn transaction_exists(&self, hash: &TxHash) -> Result<bool, StoreError> {
        Ok(self.get_transaction(hash)?.is_some())
    }

    /// Coinbase first, then block order.
    fn get_block_transactions(&self, block: &BlockHash) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Transactions touching `address` as sender or recipient, newest first.
    fn get_address_transactions(
        &self,
        address: &Address,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}
