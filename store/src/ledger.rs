//! The full ledger contract used by the node.

use crate::{BlockCommit, BlockStore, PeerStore, StoreError, TransactionStore, UtxoStore};

pub trait LedgerStore: BlockStore + TransactionStore + UtxoStore + PeerStore + Send + Sync {
    /// Apply a block atomically: insert the block and its transactions, delete
    /// the spent outputs, insert the created ones. Readers observe either the
    /// state before or after, never a mix.
    ///
    /// Fails without writing anything when:
    /// - `commit.block.height` is not `next_height()` (`OutOfOrder`, or
    ///   `UniqueConflict` when that height is already taken)
    /// - the block hash or any transaction hash is already stored (`UniqueConflict`)
    /// - a spent outpoint is not in the unspent set (`NotFound`)
    fn commit_block(&self, commit: &BlockCommit) -> Result<(), StoreError>;
}
