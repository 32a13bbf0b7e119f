//! LMDB implementation of BlockStore.

use std::ops::Bound;

use denaro_store::{BlockRecord, BlockStore, StoreError};
use denaro_types::BlockHash;

use crate::environment::{get_record, LmdbLedger};
use crate::{keys, LmdbError};

impl BlockStore for LmdbLedger {
    fn get_block_by_hash(&self, hash: &BlockHash) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        get_record(&self.blocks_db, &rtxn, hash.as_bytes())
    }

    fn get_block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        let Some(hash) = self
            .heights_db
            .get(&rtxn, &keys::height(height))
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        get_record(&self.blocks_db, &rtxn, hash)
    }

    fn get_blocks(&self, offset: u64, limit: usize) -> Result<Vec<BlockRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        let start = keys::height(offset.saturating_add(1));
        let range: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(&start[..]), Bound::Unbounded);
        let iter = self
            .heights_db
            .range(&rtxn, &range)
            .map_err(LmdbError::from)?;
        let mut blocks = Vec::new();
        for entry in iter.take(limit) {
            let (_, hash) = entry.map_err(LmdbError::from)?;
            let block = get_record(&self.blocks_db, &rtxn, hash)?.ok_or_else(|| {
                StoreError::Corruption("height index points at a missing block".into())
            })?;
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn tip(&self) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.read_txn()?;
        match self.heights_db.last(&rtxn).map_err(LmdbError::from)? {
            Some((_, hash)) => get_record(&self.blocks_db, &rtxn, hash),
            None => Ok(None),
        }
    }
}
