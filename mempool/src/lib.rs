//! Mempool: transactions accepted but not yet in a committed block.
//!
//! Every admitted transaction reserves its inputs. A reservation is
//! provisional (the ledger still lists the output as unspent) but blocks any
//! other pending transaction from spending the same output until the holder
//! is confirmed, evicted or pruned.

pub mod error;
pub mod pool;

pub use error::MempoolError;
pub use pool::{Mempool, PendingTransaction, DEFAULT_MAX_SIZE};
