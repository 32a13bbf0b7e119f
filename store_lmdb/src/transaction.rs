//! LMDB implementation of TransactionStore.

use denaro_store::{StoreError, TransactionRecord, TransactionStore};
use denaro_types::{Address, BlockHash, TxHash};

use crate::environment::{get_record, LmdbLedger};
use crate::{keys, LmdbError};

impl TransactionStore for LmdbLedger {
    fn get_transaction(&self, hash: &TxHash) -> Result<Option<TransactionRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        get_record(&self.transactions_db, &rtxn, hash.as_bytes())
    }

    fn transaction_exists(&self, hash: &TxHash) -> Result<bool, StoreError> {
        let rtxn = self.read_txn()?;
        Ok(self
            .transactions_db
            .get(&rtxn, hash.as_bytes())
            .map_err(LmdbError::from)?
            .is_some())
    }

    fn get_block_transactions(&self, block: &BlockHash) -> Result<Vec<TransactionRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        let iter = self
            .block_txs_db
            .prefix_iter(&rtxn, block.as_bytes())
            .map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for entry in iter {
            let (_, tx_hash) = entry.map_err(LmdbError::from)?;
            let record = get_record(&self.transactions_db, &rtxn, tx_hash)?.ok_or_else(|| {
                StoreError::Corruption(format!("block {block} lists a missing transaction"))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn get_address_transactions(
        &self,
        address: &Address,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        let iter = self
            .address_txs_db
            .rev_prefix_iter(&rtxn, address.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for entry in iter.take(limit) {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let hash = keys::tail_hash(key).ok_or_else(|| LmdbError::Malformed {
                db: "address_txs",
                reason: format!("key of {} bytes", key.len()),
            })?;
            if let Some(record) = get_record(&self.transactions_db, &rtxn, &hash)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
