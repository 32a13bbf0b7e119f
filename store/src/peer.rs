//! Persistent peer list.
//!
//! Keys are peer base URLs, values the last-seen Unix timestamp, so the node
//! can rejoin the network after a restart without bootstrap peers.

use crate::StoreError;

pub trait PeerStore {
    /// Insert or refresh a peer.
    fn put_peer(&self, url: &str, last_seen: u64) -> Result<(), StoreError>;

    fn delete_peer(&self, url: &str) -> Result<(), StoreError>;

    fn iter_peers(&self) -> Result<Vec<(String, u64)>, StoreError>;
}
