//! How the node talks to a peer.
//!
//! The node only needs four interactions: a liveness probe, a fire-and-forget
//! POST (relaying transactions, blocks and peers), the peer's chain height and
//! a page of its blocks. Methods return boxed futures so the transport can be
//! shared as `Arc<dyn PeerTransport>`.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Header naming the sending node on relayed requests.
pub const SENDER_HEADER: &str = "Sender-Node";

/// The header fields of a remote block needed to replay it locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBlockHeader {
    /// Height.
    pub id: u64,
    pub hash: String,
    /// Hex of the 106-byte block content.
    pub content: String,
}

/// One entry of a peer's `get_blocks` answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBlock {
    pub block: WireBlockHeader,
    /// Hex of the non-coinbase transactions, in block order.
    pub transactions: Vec<String>,
}

pub trait PeerTransport: Send + Sync {
    /// `GET {url}/`, succeeding only if the peer identifies as a node.
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    /// `POST {url}/{path}` with a JSON body.
    fn post<'a>(
        &'a self,
        url: &'a str,
        path: &'a str,
        body: &'a serde_json::Value,
        sender: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Height of the peer's tip, 0 for an empty chain.
    fn chain_height<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<u64, TransportError>>;

    /// Blocks with height greater than `offset`, ascending, at most `limit`.
    fn get_blocks<'a>(
        &'a self,
        url: &'a str,
        offset: u64,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<WireBlock>, TransportError>>;
}
