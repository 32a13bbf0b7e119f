//! Fire-and-forget propagation queue.
//!
//! Request handlers push a [`PropagationJob`] and return immediately; a single
//! worker task drains the queue and performs the fan-out.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::peers::Peers;
use crate::propagation::PropagationReport;

/// Default queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 1_024;

#[derive(Clone, Debug, PartialEq)]
pub struct PropagationJob {
    pub path: String,
    pub body: serde_json::Value,
    /// The peer the item came from, if any.
    pub exclude: Option<String>,
}

#[derive(Clone)]
pub struct Broadcaster {
    tx: mpsc::Sender<PropagationJob>,
}

impl Broadcaster {
    pub fn new(tx: mpsc::Sender<PropagationJob>) -> Self {
        Self { tx }
    }

    /// Broadcaster and the receiving end for [`run_broadcast_worker`].
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<PropagationJob>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self::new(tx), rx)
    }

    /// Queue a job. A full or closed queue drops it and returns `false`.
    pub fn submit(&self, job: PropagationJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "propagation queue rejected job");
                false
            }
        }
    }
}

/// Drain `rx` until the channel closes or `shutdown` fires. `on_report` sees
/// the outcome of every fan-out.
pub async fn run_broadcast_worker<F>(
    mut rx: mpsc::Receiver<PropagationJob>,
    peers: Arc<Peers>,
    mut shutdown: broadcast::Receiver<()>,
    on_report: F,
) where
    F: Fn(&PropagationJob, &PropagationReport) + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            job = rx.recv() => {
                let Some(job) = job else { break };
                let report = peers.propagate(&job.path, &job.body, job.exclude.as_deref()).await;
                debug!(path = %job.path, sent = report.sent, failed = report.failed, "job propagated");
                on_report(&job, &report);
            }
        }
    }
    debug!("propagation worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(path: &str) -> PropagationJob {
        PropagationJob {
            path: path.into(),
            body: serde_json::json!({}),
            exclude: None,
        }
    }

    #[tokio::test]
    async fn submit_queues_jobs_in_order() {
        let (broadcaster, mut rx) = Broadcaster::channel(4);
        assert!(broadcaster.submit(job("push_tx")));
        assert!(broadcaster.submit(job("push_block")));
        assert_eq!(rx.recv().await.unwrap().path, "push_tx");
        assert_eq!(rx.recv().await.unwrap().path, "push_block");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (broadcaster, _rx) = Broadcaster::channel(1);
        assert!(broadcaster.submit(job("a")));
        assert!(!broadcaster.submit(job("b")));
    }
}
