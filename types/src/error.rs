//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the denaro node.
#[derive(Debug, Error)]
pub enum DenaroError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("{0}")]
    Other(String),
}
