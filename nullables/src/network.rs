//! Nullable peer transport: records outbound requests and serves scripted
//! remote chains instead of touching the network.

use denaro_network::{PeerTransport, TransportError, WireBlock};
use futures_util::future::{ready, BoxFuture};
use futures_util::FutureExt;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One POST the node tried to make.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub path: String,
    pub body: serde_json::Value,
    pub sender: Option<String>,
}

#[derive(Default)]
struct State {
    sent: Vec<RecordedRequest>,
    unreachable: HashSet<String>,
    /// url → that peer's chain, index 0 is height 1.
    chains: HashMap<String, Vec<WireBlock>>,
    probes: Vec<String>,
}

/// A peer transport for testing. Every peer is reachable and has an empty
/// chain unless scripted otherwise.
#[derive(Default)]
pub struct NullNetwork {
    state: Mutex<State>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every request to `url` fail.
    pub fn set_unreachable(&self, url: &str) {
        self.state().unreachable.insert(url.to_string());
    }

    pub fn set_reachable(&self, url: &str) {
        self.state().unreachable.remove(url);
    }

    /// Give `url` a chain to serve through `chain_height` / `get_blocks`.
    pub fn set_chain(&self, url: &str, blocks: Vec<WireBlock>) {
        self.state().chains.insert(url.to_string(), blocks);
    }

    /// Every POST made so far, in order.
    pub fn sent(&self) -> Vec<RecordedRequest> {
        self.state().sent.clone()
    }

    /// POSTs made to `path`.
    pub fn sent_to_path(&self, path: &str) -> Vec<RecordedRequest> {
        self.state()
            .sent
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn probes(&self) -> Vec<String> {
        self.state().probes.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.sent.clear();
        state.probes.clear();
    }

    fn check(&self, url: &str) -> Result<(), TransportError> {
        if self.state().unreachable.contains(url) {
            Err(TransportError::Request {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl PeerTransport for NullNetwork {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        self.state().probes.push(url.to_string());
        ready(self.check(url)).boxed()
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        path: &'a str,
        body: &'a serde_json::Value,
        sender: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        let outcome = self.check(url);
        if outcome.is_ok() {
            self.state().sent.push(RecordedRequest {
                url: url.to_string(),
                path: path.to_string(),
                body: body.clone(),
                sender: sender.map(str::to_string),
            });
        }
        ready(outcome).boxed()
    }

    fn chain_height<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<u64, TransportError>> {
        let outcome = self
            .check(url)
            .map(|()| self.state().chains.get(url).map_or(0, |c| c.len() as u64));
        ready(outcome).boxed()
    }

    fn get_blocks<'a>(
        &'a self,
        url: &'a str,
        offset: u64,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<WireBlock>, TransportError>> {
        let outcome = self.check(url).map(|()| {
            self.state()
                .chains
                .get(url)
                .map(|chain| {
                    chain
                        .iter()
                        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                        .take(limit)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        });
        ready(outcome).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denaro_network::WireBlockHeader;

    fn block(id: u64) -> WireBlock {
        WireBlock {
            block: WireBlockHeader {
                id,
                hash: String::new(),
                content: String::new(),
            },
            transactions: vec![],
        }
    }

    #[tokio::test]
    async fn records_posts_and_fails_unreachable() {
        let net = NullNetwork::new();
        let body = serde_json::json!({"tx_hex": "00"});
        net.post("http://a", "push_tx", &body, Some("http://me")).await.unwrap();
        net.set_unreachable("http://b");
        assert!(net.post("http://b", "push_tx", &body, None).await.is_err());
        let sent = net.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender.as_deref(), Some("http://me"));
    }

    #[tokio::test]
    async fn serves_scripted_chain() {
        let net = NullNetwork::new();
        net.set_chain("http://a", (1..=5).map(block).collect());
        assert_eq!(net.chain_height("http://a").await.unwrap(), 5);
        let page = net.get_blocks("http://a", 2, 2).await.unwrap();
        assert_eq!(page.iter().map(|b| b.block.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(net.chain_height("http://unknown").await.unwrap(), 0);
    }
}
