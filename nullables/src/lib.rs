//! Nullable infrastructure for deterministic testing.
//!
//! Each external dependency of the node (clock, peers, storage) sits behind a
//! trait. The implementations here:
//! - return deterministic values
//! - can be steered programmatically
//! - never touch the filesystem or the network
//!
//! Usage: swap the real implementations for these in tests.

pub mod clock;
pub mod network;
pub mod store;

pub use clock::NullClock;
pub use network::{NullNetwork, RecordedRequest};
pub use store::NullStore;
