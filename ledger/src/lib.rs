//! Consensus validation.
//!
//! Pure functions over a ledger snapshot: `validate_transaction` checks one
//! spend against the unspent set and the pending reservations,
//! `validate_block` checks a whole block and yields the `BlockCommit` the
//! store applies atomically.

pub mod block;
pub mod error;
pub mod reward;
pub mod transaction;
pub mod view;

pub use block::{total_fees, validate_block, Block};
pub use error::ValidationError;
pub use reward::block_reward;
pub use transaction::{check_structure, validate_transaction, TxCheck};
pub use view::{NoPending, OverlayUtxoView, PendingView, UtxoView};
