//! Known peers and when each was last heard from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PeerError;

/// `get_nodes` returns at most this many peers.
pub const RECENT_PEERS_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNode {
    pub url: String,
    pub last_seen: u64,
}

/// Canonical form of a peer base URL: trimmed, no trailing slash, http(s) only.
pub fn normalize_url(url: &str) -> Result<String, PeerError> {
    let trimmed = url.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| PeerError::InvalidUrl(url.to_string()))?;
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(PeerError::InvalidUrl(url.to_string()));
    }
    Ok(trimmed.to_string())
}

pub struct PeerRegistry {
    self_url: Option<String>,
    peers: HashMap<String, u64>,
    max_peers: usize,
}

impl PeerRegistry {
    pub fn new(self_url: Option<&str>, max_peers: usize) -> Self {
        Self {
            self_url: self_url.and_then(|u| normalize_url(u).ok()),
            peers: HashMap::new(),
            max_peers,
        }
    }

    pub fn self_url(&self) -> Option<&str> {
        self.self_url.as_deref()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.peers.contains_key(url)
    }

    /// Normalized `url` if it may be added: not self, not known, room left.
    pub fn check_candidate(&self, url: &str) -> Result<String, PeerError> {
        let url = normalize_url(url)?;
        if self.self_url.as_deref() == Some(url.as_str()) {
            return Err(PeerError::SelfPeer(url));
        }
        if self.peers.contains_key(&url) {
            return Err(PeerError::Duplicate(url));
        }
        if self.peers.len() >= self.max_peers {
            return Err(PeerError::Full(self.max_peers));
        }
        Ok(url)
    }

    /// Add an already checked peer. Re-checks so a concurrent add of the
    /// same url loses cleanly.
    pub fn insert(&mut self, url: &str, last_seen: u64) -> Result<String, PeerError> {
        let url = self.check_candidate(url)?;
        self.peers.insert(url.clone(), last_seen);
        debug!(%url, peers = self.peers.len(), "peer registered");
        Ok(url)
    }

    /// Refresh `last_seen` of a known peer. Unknown urls are ignored.
    pub fn touch(&mut self, url: &str, now: u64) -> bool {
        let Ok(url) = normalize_url(url) else {
            return false;
        };
        match self.peers.get_mut(&url) {
            Some(seen) => {
                *seen = (*seen).max(now);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, url: &str) -> bool {
        self.peers.remove(url).is_some()
    }

    /// Most recently seen first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Vec<PeerNode> {
        let mut nodes: Vec<PeerNode> = self
            .peers
            .iter()
            .map(|(url, seen)| PeerNode {
                url: url.clone(),
                last_seen: *seen,
            })
            .collect();
        nodes.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.url.cmp(&b.url)));
        nodes.truncate(limit);
        nodes
    }

    /// Every peer except `exclude` (the origin of a relayed item) and self.
    pub fn targets(&self, exclude: Option<&str>) -> Vec<String> {
        let exclude = exclude.and_then(|u| normalize_url(u).ok());
        let mut urls: Vec<String> = self
            .peers
            .keys()
            .filter(|url| Some(url.as_str()) != exclude.as_deref())
            .filter(|url| Some(url.as_str()) != self.self_url.as_deref())
            .cloned()
            .collect();
        urls.sort();
        urls
    }
}
