use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] denaro_store::StoreError),

    #[error("peer error: {0}")]
    Peer(#[from] denaro_network::PeerError),

    #[error("transport error: {0}")]
    Transport(#[from] denaro_network::TransportError),

    #[error("sync error: {0}")]
    Sync(#[from] denaro_network::SyncError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
