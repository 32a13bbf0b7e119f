use denaro_store::StoreError;
use thiserror::Error;

/// Failure talking to one peer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {reason}")]
    Response { url: String, reason: String },
}

/// Why an `add_node` request was refused. Never fatal to the node.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("invalid peer url {0:?}")]
    InvalidUrl(String),

    #[error("refusing to add self ({0})")]
    SelfPeer(String),

    #[error("peer {0} already known")]
    Duplicate(String),

    #[error("peer limit of {0} reached")]
    Full(usize),

    #[error("peer {url} unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stops a sync run; the chain stays at the last good height.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a sync is already running")]
    AlreadySyncing,

    #[error("no peer to sync from")]
    NoPeers,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("peer sent an undecodable block at height {height}: {reason}")]
    BadBlock { height: u64, reason: String },

    #[error("block at height {height} rejected: {reason}")]
    Rejected { height: u64, reason: String },

    #[error("peer {peer} served no new blocks past height {height}")]
    Stalled { peer: String, height: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
