//! Span constructors with consistent names and fields, so traces of one
//! block or request can be filtered and correlated.

use tracing::{info_span, Span};

/// The acceptance pipeline for a single block.
pub fn block_process_span(block_hash: &str, source: &str) -> Span {
    info_span!("block_process", hash = %block_hash, source = %source)
}

/// One synchronization run.
pub fn sync_span(peer: Option<&str>) -> Span {
    info_span!("sync", peer = peer.unwrap_or("any"))
}

/// A single RPC operation.
pub fn rpc_span(action: &str) -> Span {
    info_span!("rpc", action = %action)
}
