//! Write batching: every index touched by a block commit goes through one
//! LMDB write transaction.
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//! LMDB admits one writer at a time, which serializes concurrent commits.

use heed::RwTxn;
use tracing::debug;

use denaro_store::{BlockCommit, BlockRecord, StoreError, TransactionRecord, UnspentOutput};
use denaro_types::OutPoint;

use crate::environment::{get_record, LmdbLedger};
use crate::keys;
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    ledger: &'a LmdbLedger,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(ledger: &'a LmdbLedger) -> Result<Self, StoreError> {
        let txn = ledger.env.write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, ledger })
    }

    /// Height the next block must have, read inside this transaction.
    pub fn next_height(&self) -> Result<u64, StoreError> {
        let last = self
            .ledger
            .heights_db
            .last(&self.txn)
            .map_err(LmdbError::from)?;
        match last {
            None => Ok(1),
            Some((key, _)) => {
                let bytes: [u8; 8] = key.try_into().map_err(|_| LmdbError::Malformed {
                    db: "heights",
                    reason: format!("key of {} bytes", key.len()),
                })?;
                Ok(u64::from_be_bytes(bytes) + 1)
            }
        }
    }

    pub fn put_block(&mut self, block: &BlockRecord) -> Result<(), StoreError> {
        let db = &self.ledger.blocks_db;
        if db
            .get(&self.txn, block.hash.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::UniqueConflict(format!("block {}", block.hash)));
        }
        let bytes = bincode::serialize(block).map_err(LmdbError::from)?;
        db.put(&mut self.txn, block.hash.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.ledger
            .heights_db
            .put(&mut self.txn, &keys::height(block.height), block.hash.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_transaction(
        &mut self,
        record: &TransactionRecord,
        height: u64,
        position: u16,
    ) -> Result<(), StoreError> {
        let db = &self.ledger.transactions_db;
        if db
            .get(&self.txn, record.hash.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::UniqueConflict(format!("transaction {}", record.hash)));
        }
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        db.put(&mut self.txn, record.hash.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.ledger
            .block_txs_db
            .put(
                &mut self.txn,
                &keys::block_tx(&record.block_hash, position),
                record.hash.as_bytes(),
            )
            .map_err(LmdbError::from)?;

        let mut touched = record.inputs_addresses.clone();
        touched.extend(record.outputs_addresses.iter().cloned());
        touched.sort();
        touched.dedup();
        for address in &touched {
            self.ledger
                .address_txs_db
                .put(
                    &mut self.txn,
                    &keys::address_tx(address, height, position, &record.hash),
                    &[],
                )
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    /// Remove an output from the unspent set. Missing outputs are `NotFound`.
    pub fn spend(&mut self, outpoint: &OutPoint) -> Result<(), StoreError> {
        let key = keys::outpoint(outpoint);
        let utxo: UnspentOutput = get_record(&self.ledger.utxos_db, &self.txn, &key)?
            .ok_or_else(|| StoreError::NotFound(format!("unspent output {outpoint}")))?;
        self.ledger
            .utxos_db
            .delete(&mut self.txn, &key)
            .map_err(LmdbError::from)?;
        self.ledger
            .address_utxos_db
            .delete(&mut self.txn, &keys::address_utxo(&utxo.address, outpoint))
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_unspent(&mut self, utxo: &UnspentOutput) -> Result<(), StoreError> {
        let outpoint = utxo.outpoint();
        let bytes = bincode::serialize(utxo).map_err(LmdbError::from)?;
        self.ledger
            .utxos_db
            .put(&mut self.txn, &keys::outpoint(&outpoint), &bytes)
            .map_err(LmdbError::from)?;
        self.ledger
            .address_utxos_db
            .put(&mut self.txn, &keys::address_utxo(&utxo.address, &outpoint), &[])
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

/// Apply a whole block inside one batch. Any error drops the batch, which
/// aborts the transaction.
pub(crate) fn commit_block(ledger: &LmdbLedger, commit: &BlockCommit) -> Result<(), StoreError> {
    let mut batch = ledger.write_batch()?;
    let expected = batch.next_height()?;
    let height = commit.block.height;
    if height < expected {
        return Err(StoreError::UniqueConflict(format!("height {height}")));
    }
    if height > expected {
        return Err(StoreError::OutOfOrder {
            expected,
            actual: height,
        });
    }

    batch.put_block(&commit.block)?;
    for (position, record) in commit.transactions.iter().enumerate() {
        let position = u16::try_from(position)
            .map_err(|_| StoreError::Serialization("more than 65535 transactions".into()))?;
        batch.put_transaction(record, height, position)?;
    }
    for outpoint in &commit.spent {
        batch.spend(outpoint)?;
    }
    for utxo in &commit.created {
        batch.put_unspent(utxo)?;
    }
    batch.commit()?;

    debug!(
        height,
        hash = %commit.block.hash,
        txs = commit.transactions.len(),
        spent = commit.spent.len(),
        created = commit.created.len(),
        "committed block"
    );
    Ok(())
}
