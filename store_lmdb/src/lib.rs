//! LMDB ledger store.
//!
//! Implements the `denaro-store` traits with `heed`. All databases live in one
//! environment so a block commit is a single LMDB write transaction.

pub mod block;
pub mod environment;
pub mod error;
mod keys;
pub mod peer;
pub mod transaction;
pub mod utxo;
pub mod write_batch;

pub use environment::LmdbLedger;
pub use error::LmdbError;
pub use write_batch::WriteBatch;
