//! Peer-to-peer layer of the denaro node.
//!
//! Peers are plain HTTP base URLs. This crate keeps the registry of known
//! peers, talks to them through a [`PeerTransport`] (real HTTP or a test
//! double), fans requests out concurrently and suppresses re-propagation of
//! recently seen items.

pub mod broadcast;
pub mod error;
pub mod http;
pub mod peers;
pub mod propagation;
pub mod recent;
pub mod registry;
pub mod transport;

pub use broadcast::{run_broadcast_worker, Broadcaster, PropagationJob, DEFAULT_QUEUE_DEPTH};
pub use error::{PeerError, SyncError, TransportError};
pub use http::HttpTransport;
pub use peers::Peers;
pub use propagation::{PropagationReport, Propagator};
pub use recent::{RecentlySeen, DEFAULT_RECENT_CAPACITY};
pub use registry::{normalize_url, PeerNode, PeerRegistry, RECENT_PEERS_LIMIT};
pub use transport::{PeerTransport, WireBlock, WireBlockHeader, SENDER_HEADER};
