//! Nullable store: thread-safe in-memory ledger for testing.
//!
//! Enforces the same commit rules as the LMDB backend (height order, unique
//! hashes, spent outputs must exist) and applies a block all-or-nothing.

use denaro_store::{
    BlockCommit, BlockRecord, BlockStore, LedgerStore, PeerStore, StoreError, TransactionRecord,
    TransactionStore, UnspentOutput, UtxoStore,
};
use denaro_types::{Address, BlockHash, OutPoint, TxHash};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    blocks: HashMap<BlockHash, BlockRecord>,
    heights: BTreeMap<u64, BlockHash>,
    transactions: HashMap<TxHash, TransactionRecord>,
    block_txs: HashMap<BlockHash, Vec<TxHash>>,
    /// (height, position) keeps newest-first ordering cheap.
    address_txs: HashMap<Address, BTreeSet<(u64, u16, TxHash)>>,
    utxos: BTreeMap<OutPoint, UnspentOutput>,
    peers: BTreeMap<String, u64>,
}

/// An in-memory ledger store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    state: RwLock<State>,
    fail_next_commit: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an unspent output without a block, for validation tests.
    pub fn insert_unspent(&self, utxo: UnspentOutput) {
        self.write().utxos.insert(utxo.outpoint(), utxo);
    }

    /// Make the next `commit_block` fail with a backend error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn block_count(&self) -> usize {
        self.read().blocks.len()
    }

    pub fn unspent_count(&self) -> usize {
        self.read().utxos.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockStore for NullStore {
    fn get_block_by_hash(&self, hash: &BlockHash) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self.read().blocks.get(hash).cloned())
    }

    fn get_block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        let state = self.read();
        Ok(state
            .heights
            .get(&height)
            .and_then(|hash| state.blocks.get(hash))
            .cloned())
    }

    fn get_blocks(&self, offset: u64, limit: usize) -> Result<Vec<BlockRecord>, StoreError> {
        let state = self.read();
        Ok(state
            .heights
            .range(offset.saturating_add(1)..)
            .take(limit)
            .filter_map(|(_, hash)| state.blocks.get(hash).cloned())
            .collect())
    }

    fn tip(&self) -> Result<Option<BlockRecord>, StoreError> {
        let state = self.read();
        Ok(state
            .heights
            .last_key_value()
            .and_then(|(_, hash)| state.blocks.get(hash))
            .cloned())
    }
}

impl TransactionStore for NullStore {
    fn get_transaction(&self, hash: &TxHash) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.read().transactions.get(hash).cloned())
    }

    fn get_block_transactions(&self, block: &BlockHash) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.read();
        Ok(state
            .block_txs
            .get(block)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|h| state.transactions.get(h).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_address_transactions(
        &self,
        address: &Address,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.read();
        Ok(state
            .address_txs
            .get(address)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit)
                    .filter_map(|(_, _, h)| state.transactions.get(h).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl UtxoStore for NullStore {
    fn get_unspent(&self, address: &Address) -> Result<Vec<UnspentOutput>, StoreError> {
        Ok(self
            .read()
            .utxos
            .values()
            .filter(|u| &u.address == address)
            .cloned()
            .collect())
    }

    fn get_unspent_output(&self, outpoint: &OutPoint) -> Result<Option<UnspentOutput>, StoreError> {
        Ok(self.read().utxos.get(outpoint).cloned())
    }

    fn unspent_outpoints(&self) -> Result<Vec<OutPoint>, StoreError> {
        Ok(self.read().utxos.keys().copied().collect())
    }
}

impl PeerStore for NullStore {
    fn put_peer(&self, url: &str, last_seen: u64) -> Result<(), StoreError> {
        self.write().peers.insert(url.to_string(), last_seen);
        Ok(())
    }

    fn delete_peer(&self, url: &str) -> Result<(), StoreError> {
        self.write().peers.remove(url);
        Ok(())
    }

    fn iter_peers(&self) -> Result<Vec<(String, u64)>, StoreError> {
        Ok(self
            .read()
            .peers
            .iter()
            .map(|(url, seen)| (url.clone(), *seen))
            .collect())
    }
}

impl LedgerStore for NullStore {
    fn commit_block(&self, commit: &BlockCommit) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut state = self.write();

        // Check everything before touching the maps.
        let expected = state.heights.last_key_value().map_or(1, |(h, _)| h + 1);
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
        if state.blocks.contains_key(&commit.block.hash) {
            return Err(StoreError::UniqueConflict(format!("block {}", commit.block.hash)));
        }
        let mut seen = BTreeSet::new();
        for record in &commit.transactions {
            if state.transactions.contains_key(&record.hash) || !seen.insert(record.hash) {
                return Err(StoreError::UniqueConflict(format!("transaction {}", record.hash)));
            }
        }
        let mut spent = BTreeSet::new();
        for outpoint in &commit.spent {
            if !state.utxos.contains_key(outpoint) || !spent.insert(*outpoint) {
                return Err(StoreError::NotFound(format!("unspent output {outpoint}")));
            }
        }
        if commit.transactions.len() > usize::from(u16::MAX) + 1 {
            return Err(StoreError::Serialization("more than 65535 transactions".into()));
        }

        let block_hash = commit.block.hash;
        state.blocks.insert(block_hash, commit.block.clone());
        state.heights.insert(height, block_hash);
        let mut hashes = Vec::with_capacity(commit.transactions.len());
        for (position, record) in commit.transactions.iter().enumerate() {
            let position = position as u16;
            let mut touched: BTreeSet<&Address> = record.inputs_addresses.iter().collect();
            touched.extend(record.outputs_addresses.iter());
            for address in touched {
                state
                    .address_txs
                    .entry(address.clone())
                    .or_default()
                    .insert((height, position, record.hash));
            }
            state.transactions.insert(record.hash, record.clone());
            hashes.push(record.hash);
        }
        state.block_txs.insert(block_hash, hashes);
        for outpoint in &commit.spent {
            state.utxos.remove(outpoint);
        }
        for utxo in &commit.created {
            state.utxos.insert(utxo.outpoint(), utxo.clone());
        }
        Ok(())
    }
}
