use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A block hash, block height or transaction hash is already committed.
    /// Callers treat this as "already known".
    #[error("already exists: {0}")]
    UniqueConflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("commit out of order: expected height {expected}, got {actual}")]
    OutOfOrder { expected: u64, actual: u64 },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn is_unique_conflict(&self) -> bool {
        matches!(self, Self::UniqueConflict(_))
    }
}
