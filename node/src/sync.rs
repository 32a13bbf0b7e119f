//! Chain synchronization: pull blocks we are missing from a peer and feed
//! them through the acceptance pipeline in height order.
//!
//! At most one run is active per node. [`ChainSynchronizer::try_begin`] hands
//! out an owned guard; the flag clears when the guard drops, even if the run
//! errors or its task is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use denaro_network::{PeerTransport, SyncError, WireBlock};
use denaro_transactions::{BlockContent, LedgerTransaction};

use crate::pipeline::{BlockOutcome, BlockPipeline, BlockSource, InboundBlock};
use crate::tracing_spans::sync_span;

/// Blocks requested per `get_blocks` call.
pub const DEFAULT_SYNC_BATCH: usize = 200;

/// Proof that the caller owns the single sync slot.
pub struct SyncGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The peer blocks were taken from, if any was ahead of us.
    pub peer: Option<String>,
    pub blocks_applied: u64,
    pub height: u64,
}

pub struct ChainSynchronizer {
    running: Arc<AtomicBool>,
    batch_size: usize,
}

impl Default for ChainSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_BATCH)
    }
}

impl ChainSynchronizer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            batch_size: batch_size.max(1),
        }
    }

    /// Claim the sync slot, or `None` if a run is already in flight.
    pub fn try_begin(&self) -> Option<SyncGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard {
                flag: self.running.clone(),
            })
    }

    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sync from the first of `peers` whose chain is longer than ours.
    ///
    /// Peers that cannot be reached are skipped. Once blocks are being taken
    /// from a peer, the first block that fails to apply ends the run, as does a
    /// page that adds nothing to the chain.
    pub async fn run(
        &self,
        _guard: &SyncGuard,
        pipeline: &BlockPipeline,
        transport: &dyn PeerTransport,
        peers: &[String],
    ) -> Result<SyncReport, SyncError> {
        if peers.is_empty() {
            return Err(SyncError::NoPeers);
        }
        let hint = (peers.len() == 1).then(|| peers[0].as_str());
        async move {
            let local_next = pipeline.store().next_height()?;
            for url in peers {
                let remote = match transport.chain_height(url).await {
                    Ok(height) => height,
                    Err(e) => {
                        warn!(peer = %url, error = %e, "peer skipped");
                        continue;
                    }
                };
                if remote < local_next {
                    debug!(peer = %url, remote, "peer not ahead");
                    continue;
                }
                return self.sync_from(url, remote, pipeline, transport).await;
            }
            Ok(SyncReport {
                peer: None,
                blocks_applied: 0,
                height: local_next - 1,
            })
        }
        .instrument(sync_span(hint))
        .await
    }

    async fn sync_from(
        &self,
        url: &str,
        remote: u64,
        pipeline: &BlockPipeline,
        transport: &dyn PeerTransport,
    ) -> Result<SyncReport, SyncError> {
        info!(peer = %url, remote, "syncing");
        let mut applied = 0;
        loop {
            let next = pipeline.store().next_height()?;
            if next > remote {
                break;
            }
            let page = transport.get_blocks(url, next - 1, self.batch_size).await?;
            if page.is_empty() {
                break;
            }
            let mut page_applied = 0u64;
            for wire in &page {
                let height = wire.block.id;
                let block = decode_wire_block(wire)?;
                match pipeline.process(block, BlockSource::Sync).await {
                    BlockOutcome::Accepted { .. } => page_applied += 1,
                    BlockOutcome::AlreadyKnown { .. } => {}
                    BlockOutcome::GapDetected { expected_height, .. } => {
                        return Err(SyncError::Rejected {
                            height,
                            reason: format!("does not connect to local chain at {expected_height}"),
                        });
                    }
                    BlockOutcome::Rejected { stage, reason } => {
                        return Err(SyncError::Rejected {
                            height,
                            reason: format!("{stage}: {reason}"),
                        });
                    }
                }
            }
            // A page starts at `next`, so a peer that is really ahead always
            // extends the chain.
            if page_applied == 0 {
                warn!(peer = %url, height = next - 1, "peer served only known blocks");
                return Err(SyncError::Stalled {
                    peer: url.to_string(),
                    height: next - 1,
                });
            }
            applied += page_applied;
        }
        let height = pipeline.store().next_height()? - 1;
        info!(peer = %url, applied, height, "sync finished");
        Ok(SyncReport {
            peer: Some(url.to_string()),
            blocks_applied: applied,
            height,
        })
    }
}

/// Header plus the non-coinbase transactions of a block served by a peer.
/// A coinbase in the list is dropped; the pipeline derives its own.
pub fn decode_wire_block(wire: &WireBlock) -> Result<InboundBlock, SyncError> {
    let height = wire.block.id;
    let bad = |reason: String| SyncError::BadBlock { height, reason };
    let content = BlockContent::from_hex(&wire.block.content).map_err(|e| bad(e.to_string()))?;
    let mut transactions = Vec::with_capacity(wire.transactions.len());
    for hex in &wire.transactions {
        match LedgerTransaction::from_hex(hex).map_err(|e| bad(e.to_string()))? {
            LedgerTransaction::Regular(tx) => transactions.push(tx),
            LedgerTransaction::Coinbase(_) => {}
        }
    }
    Ok(InboundBlock {
        content,
        transactions,
        height: Some(height),
    })
}
