use denaro_ledger::ValidationError;
use denaro_store::StoreError;
use denaro_types::{OutPoint, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MempoolError {
    /// Pending or already committed. Callers report this as success.
    #[error("transaction {0} already present")]
    AlreadyPresent(TxHash),

    #[error("output {outpoint} is already being spent by pending transaction {spender}")]
    DoubleSpend { outpoint: OutPoint, spender: TxHash },

    #[error("mempool is full ({max} transactions)")]
    Full { max: usize },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MempoolError {
    pub fn is_already_present(&self) -> bool {
        matches!(self, Self::AlreadyPresent(_))
    }
}
