//! Wallet core library for denaro.
//!
//! Key storage, input selection, payment building and signing, and a thin
//! HTTP client for the node RPC.

pub mod coin_selector;
pub mod error;
pub mod keystore;
pub mod transaction_builder;
pub mod wallet;

pub use coin_selector::{select_inputs, Selection, SelectionError, MAX_INPUTS};
pub use error::WalletError;
pub use keystore::WalletFile;
pub use transaction_builder::{build_payment, Payment};
pub use wallet::{AddressBalance, AddressSummary, NodeClient, PushTxResult, SentPayment, Wallet};
