//! Ledger store contract.
//!
//! Every backend (LMDB, in-memory for testing) implements these traits. The
//! rest of the workspace depends only on the traits and the record types.

pub mod block;
pub mod error;
pub mod ledger;
pub mod peer;
pub mod records;
pub mod transaction;
pub mod utxo;

pub use block::BlockStore;
pub use error::StoreError;
pub use ledger::LedgerStore;
pub use peer::PeerStore;
pub use records::{BlockCommit, BlockId, BlockRecord, TransactionRecord, UnspentOutput};
pub use transaction::TransactionStore;
pub use utxo::UtxoStore;
