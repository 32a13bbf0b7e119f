use denaro_store::StoreError;
use denaro_types::{OutPoint, TxHash};
use thiserror::Error;

/// Why a transaction or block was refused. Rejects the single item only.
#[derive(Debug, Error)]
pub enum ValidationError {
    // ── Transaction structure ───────────────────────────────────────────
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("too many inputs: {count} > {max}")]
    TooManyInputs { count: usize, max: usize },

    #[error("too many outputs: {count} > {max}")]
    TooManyOutputs { count: usize, max: usize },

    #[error("output {0} has zero amount")]
    ZeroOutput(usize),

    #[error("message too long: {len} > {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("outpoint {0} is spent twice in one transaction")]
    DuplicateInput(OutPoint),

    #[error("coinbase transactions cannot be pushed")]
    UnexpectedCoinbase,

    // ── Transaction against ledger ──────────────────────────────────────
    #[error("input {0} is not an unspent output")]
    InputNotFound(OutPoint),

    #[error("input {outpoint} is already reserved by pending transaction {spender}")]
    PendingConflict { outpoint: OutPoint, spender: TxHash },

    #[error("input {0} is signed by a key that does not own it")]
    WrongOwner(OutPoint),

    #[error("invalid signature in transaction {0}")]
    InvalidSignature(TxHash),

    #[error("outputs {outputs} exceed inputs {inputs}")]
    NegativeFee { inputs: String, outputs: String },

    #[error("amount overflow")]
    Overflow,

    // ── Block ────────────────────────────────────────────────────────────
    #[error("previous hash {actual} is not the chain tip {expected}")]
    PreviousMismatch { expected: String, actual: String },

    #[error("timestamp {timestamp} is not after the tip's {tip}")]
    TimestampNotIncreasing { timestamp: u64, tip: u64 },

    #[error("timestamp {timestamp} is too far ahead of local time {now}")]
    TimestampInFuture { timestamp: u64, now: u64 },

    #[error("declared difficulty {declared}, expected {expected}")]
    WrongDifficulty { declared: String, expected: String },

    #[error("block hash does not meet difficulty {0}")]
    InsufficientWork(String),

    #[error("block has no coinbase as its first transaction")]
    MissingCoinbase,

    #[error("transaction {0} is an extra coinbase")]
    ExtraCoinbase(usize),

    #[error("coinbase pays {actual}, expected {expected}")]
    CoinbaseAmount { expected: String, actual: String },

    #[error("coinbase does not pay the block's miner")]
    CoinbaseRecipient,

    #[error("coinbase is bound to another block")]
    CoinbaseBlockHash,

    #[error("merkle root does not match the block's transactions")]
    MerkleMismatch,

    #[error("block transactions take {size} bytes, limit {max}")]
    BlockTooLarge { size: usize, max: usize },

    #[error("transaction {0} appears twice in the block")]
    DuplicateTransaction(TxHash),

    #[error("transaction {0} is already committed")]
    AlreadyCommitted(TxHash),

    #[error(transparent)]
    Store(#[from] StoreError),
}
