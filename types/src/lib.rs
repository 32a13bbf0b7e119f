//! Fundamental types for the denaro node.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! amounts, hashes, outpoints, addresses, keys, timestamps, difficulty and consensus
//! parameters.

pub mod address;
pub mod amount;
pub mod block;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use block::BlockHash;
pub use difficulty::Difficulty;
pub use error::DenaroError;
pub use hash::{OutPoint, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use params::ConsensusParams;
pub use time::{Clock, SystemClock, Timestamp};
