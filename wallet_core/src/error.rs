use thiserror::Error;

use crate::coin_selector::SelectionError;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("wallet has no keys, run createwallet first")]
    NoKeys,

    #[error("message is {len} bytes, at most {max} allowed")]
    MessageTooLong { len: usize, max: usize },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("transaction building error: {0}")]
    TransactionBuild(#[from] denaro_transactions::TransactionError),

    #[error("node RPC error: {0}")]
    Node(String),

    #[error("node refused: {0}")]
    Refused(String),

    #[error("wallet file error: {0}")]
    WalletFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
