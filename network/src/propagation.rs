//! Concurrent fan-out of one request to many peers.
//!
//! Every peer gets its own bounded-time request; a slow or broken peer is
//! logged and counted, never allowed to hold up or abort the others.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info_span, warn, Instrument};

use crate::transport::PeerTransport;
use crate::TransportError;

/// Outcome of one fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Propagator {
    transport: Arc<dyn PeerTransport>,
    timeout: Duration,
}

impl Propagator {
    pub fn new(transport: Arc<dyn PeerTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn transport(&self) -> &Arc<dyn PeerTransport> {
        &self.transport
    }

    /// POST `body` to `path` on every url in `peers`, concurrently.
    pub async fn propagate(
        &self,
        peers: &[String],
        path: &str,
        body: &serde_json::Value,
        sender: Option<&str>,
    ) -> PropagationReport {
        let span = info_span!("propagate", path, peers = peers.len());
        async move {
            let sends = peers.iter().map(|url| async move {
                let outcome = tokio::time::timeout(
                    self.timeout,
                    self.transport.post(url, path, body, sender),
                )
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout { url: url.clone() }));
                (url, outcome)
            });

            let mut report = PropagationReport::default();
            for (url, outcome) in join_all(sends).await {
                match outcome {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        warn!(%url, error = %e, "propagation to peer failed");
                        report.failed += 1;
                    }
                }
            }
            debug!(sent = report.sent, failed = report.failed, "propagation done");
            report
        }
        .instrument(span)
        .await
    }
}
