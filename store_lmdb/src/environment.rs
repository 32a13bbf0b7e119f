//! LMDB environment and database handles.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::write_batch::WriteBatch;
use crate::LmdbError;
use denaro_store::StoreError;

/// Default map size: 16 GiB of address space, pages are allocated lazily.
pub const DEFAULT_MAP_SIZE: usize = 16 * 1024 * 1024 * 1024;

const MAX_DBS: u32 = 8;

/// The ledger: one LMDB environment holding every index.
pub struct LmdbLedger {
    pub(crate) env: Env,
    /// block hash -> bincode `BlockRecord`
    pub(crate) blocks_db: Database<Bytes, Bytes>,
    /// height (BE) -> block hash
    pub(crate) heights_db: Database<Bytes, Bytes>,
    /// tx hash -> bincode `TransactionRecord`
    pub(crate) transactions_db: Database<Bytes, Bytes>,
    /// block hash | position -> tx hash
    pub(crate) block_txs_db: Database<Bytes, Bytes>,
    /// address | height | position | tx hash -> ()
    pub(crate) address_txs_db: Database<Bytes, Bytes>,
    /// tx hash | index -> bincode `UnspentOutput`
    pub(crate) utxos_db: Database<Bytes, Bytes>,
    /// address | tx hash | index -> ()
    pub(crate) address_utxos_db: Database<Bytes, Bytes>,
    /// url -> last seen (LE u64)
    pub(crate) peers_db: Database<Bytes, Bytes>,
}

impl LmdbLedger {
    /// Open or create the ledger under `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)
            .map_err(|e| StoreError::Backend(format!("create {}: {e}", path.display())))?;

        // SAFETY: the environment is opened once per process and the files are
        // not modified by anything else while it is open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)
                .map_err(LmdbError::from)?
        };

        let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
        let mut create = |name: &str| -> Result<Database<Bytes, Bytes>, StoreError> {
            Ok(env
                .create_database(&mut wtxn, Some(name))
                .map_err(LmdbError::from)?)
        };
        let blocks_db = create("blocks")?;
        let heights_db = create("heights")?;
        let transactions_db = create("transactions")?;
        let block_txs_db = create("block_txs")?;
        let address_txs_db = create("address_txs")?;
        let utxos_db = create("utxos")?;
        let address_utxos_db = create("address_utxos")?;
        let peers_db = create("peers")?;
        wtxn.commit().map_err(LmdbError::from)?;

        info!(path = %path.display(), "opened LMDB ledger");

        Ok(Self {
            env,
            blocks_db,
            heights_db,
            transactions_db,
            block_txs_db,
            address_txs_db,
            utxos_db,
            address_utxos_db,
            peers_db,
        })
    }

    /// Begin an atomic multi-index write.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }

    pub(crate) fn read_txn(&self) -> Result<RoTxn<'_>, StoreError> {
        Ok(self.env.read_txn().map_err(LmdbError::from)?)
    }
}

/// Fetch and decode one bincode record.
pub(crate) fn get_record<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    match db.get(txn, key).map_err(LmdbError::from)? {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
        None => Ok(None),
    }
}

impl denaro_store::LedgerStore for LmdbLedger {
    fn commit_block(&self, commit: &denaro_store::BlockCommit) -> Result<(), StoreError> {
        crate::write_batch::commit_block(self, commit)
    }
}
