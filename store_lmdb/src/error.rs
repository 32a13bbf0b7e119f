use denaro_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("malformed entry in {db}: {reason}")]
    Malformed { db: &'static str, reason: String },
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        Self::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Heed(msg) => StoreError::Backend(msg),
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            malformed @ LmdbError::Malformed { .. } => StoreError::Corruption(malformed.to_string()),
        }
    }
}
