use thiserror::Error;

/// Malformed wire bytes. Never fatal to the node, the caller rejects the item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("truncated input: needed {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid message flag {0}")]
    InvalidFlag(u8),

    #[error("coinbase must carry exactly one output, found {0}")]
    CoinbaseShape(u8),

    #[error("block content must be {expected} bytes, got {actual}")]
    ContentLength { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no signing key for input {index} ({public_key})")]
    MissingKey { index: usize, public_key: String },

    #[error("transaction has {0} inputs, the wire format allows 255")]
    TooManyInputs(usize),

    #[error("transaction has {0} outputs, the wire format allows 255")]
    TooManyOutputs(usize),

    #[error("message of {0} bytes does not fit the wire format")]
    MessageTooLong(usize),
}
