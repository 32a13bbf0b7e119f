//! Block index.

use crate::records::{BlockId, BlockRecord};
use crate::StoreError;
use denaro_types::BlockHash;

pub trait BlockStore {
    fn get_block_by_hash(&self, hash: &BlockHash) -> Result<Option<BlockRecord>, StoreError>;

    fn get_block_by_height(&self, height: u64) -> Result<Option<BlockRecord>, StoreError>;

    /// Blocks with height greater than `offset`, ascending, at most `limit`.
    fn get_blocks(&self, offset: u64, limit: usize) -> Result<Vec<BlockRecord>, StoreError>;

    /// The highest committed block.
    fn tip(&self) -> Result<Option<BlockRecord>, StoreError>;

    /// Height the next accepted block must carry. Genesis is height 1.
    fn next_height(&self) -> Result<u64, StoreError> {
        Ok(self.tip()?.map_or(1, |b| b.height + 1))
    }

    fn get_block(&self, id: BlockId) -> Result<Option<BlockRecord>, StoreError> {
        match id {
            BlockId::Height(h) => self.get_block_by_height(h),
            BlockId::Hash(h) => self.get_block_by_hash(&h),
        }
    }
}
