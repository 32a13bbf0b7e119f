//! The registry together with persistence, probing and fan-out.

use std::sync::Arc;
use std::time::Duration;

use denaro_store::PeerStore;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::propagation::{PropagationReport, Propagator};
use crate::registry::{normalize_url, PeerNode, PeerRegistry};
use crate::{PeerError, TransportError};

pub struct Peers {
    registry: RwLock<PeerRegistry>,
    store: Arc<dyn PeerStore + Send + Sync>,
    propagator: Propagator,
    probe_timeout: Duration,
}

impl Peers {
    pub fn new(
        registry: PeerRegistry,
        store: Arc<dyn PeerStore + Send + Sync>,
        propagator: Propagator,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            store,
            propagator,
            probe_timeout,
        }
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Reload persisted peers, then register bootstrap peers without probing.
    pub async fn load(&self, bootstrap: &[String], now: u64) -> Result<usize, PeerError> {
        let persisted = self.store.iter_peers()?;
        let mut registry = self.registry.write().await;
        for (url, last_seen) in persisted {
            if let Err(e) = registry.insert(&url, last_seen) {
                warn!(%url, error = %e, "skipping persisted peer");
            }
        }
        for url in bootstrap {
            match registry.insert(url, now) {
                Ok(url) => self.store.put_peer(&url, now)?,
                Err(PeerError::Duplicate(_)) => {}
                Err(e) => warn!(%url, error = %e, "skipping bootstrap peer"),
            }
        }
        info!(peers = registry.len(), "peer registry loaded");
        Ok(registry.len())
    }

    /// Check, probe, register and persist a new peer. Returns its normalized url.
    pub async fn add_peer(&self, url: &str, now: u64) -> Result<String, PeerError> {
        let url = self.registry.read().await.check_candidate(url)?;

        // Probe without holding the lock.
        let probe = tokio::time::timeout(self.probe_timeout, self.propagator.transport().probe(&url))
            .await
            .unwrap_or_else(|_| Err(TransportError::Timeout { url: url.clone() }));
        if let Err(source) = probe {
            return Err(PeerError::Unreachable { url, source });
        }

        let url = self.registry.write().await.insert(&url, now)?;
        self.store.put_peer(&url, now)?;
        info!(%url, "peer added");
        Ok(url)
    }

    /// Refresh `last_seen` for the sender of an inbound request, if known.
    pub async fn touch(&self, url: &str, now: u64) -> Result<(), PeerError> {
        let known = self.registry.write().await.touch(url, now);
        if known {
            self.store.put_peer(&normalize_url(url)?, now)?;
        }
        Ok(())
    }

    pub async fn remove(&self, url: &str) -> Result<bool, PeerError> {
        let url = normalize_url(url)?;
        let removed = self.registry.write().await.remove(&url);
        if removed {
            self.store.delete_peer(&url)?;
        }
        Ok(removed)
    }

    pub async fn recent(&self, limit: usize) -> Vec<PeerNode> {
        self.registry.read().await.recent(limit)
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.is_empty()
    }

    pub async fn self_url(&self) -> Option<String> {
        self.registry.read().await.self_url().map(str::to_string)
    }

    /// Peers to try, most recently seen first.
    pub async fn sync_candidates(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .recent(usize::MAX)
            .into_iter()
            .map(|p| p.url)
            .collect()
    }

    /// Fan `body` out to every peer except `exclude` and self.
    pub async fn propagate(
        &self,
        path: &str,
        body: &serde_json::Value,
        exclude: Option<&str>,
    ) -> PropagationReport {
        let (targets, sender) = {
            let registry = self.registry.read().await;
            (registry.targets(exclude), registry.self_url().map(str::to_string))
        };
        if targets.is_empty() {
            return PropagationReport::default();
        }
        self.propagator
            .propagate(&targets, path, body, sender.as_deref())
            .await
    }
}
