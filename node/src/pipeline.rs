//! Block acceptance pipeline.
//!
//! Every block, whether pushed by a miner, relayed by a peer or fetched during
//! sync, passes through the same stages: dedup, previous-hash check, full
//! validation against the ledger, atomic commit. Stages after dedup run under a
//! single commit lock so two blocks can never both extend the same tip.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

use denaro_ledger::{validate_block, Block, ValidationError};
use denaro_mempool::Mempool;
use denaro_network::{Broadcaster, PropagationJob, RecentlySeen};
use denaro_store::{BlockRecord, LedgerStore, StoreError};
use denaro_transactions::{BlockContent, Transaction};
use denaro_types::{BlockHash, Clock, ConsensusParams, Difficulty};
use denaro_work::{ChainSample, DifficultyAdjuster};

use crate::metrics::NodeMetrics;
use crate::tracing_spans::block_process_span;

/// Where an incoming block came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockSource {
    /// `push_block`, from a miner (`origin: None`) or a relaying peer.
    Push { origin: Option<String> },
    /// Fetched by the chain synchronizer. Never re-propagated.
    Sync,
}

impl BlockSource {
    fn label(&self) -> &'static str {
        match self {
            Self::Push { origin: None } => "local",
            Self::Push { origin: Some(_) } => "peer",
            Self::Sync => "sync",
        }
    }

    fn origin(&self) -> Option<&str> {
        match self {
            Self::Push { origin } => origin.as_deref(),
            Self::Sync => None,
        }
    }
}

/// The stage a block was in when it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    PrevCheck,
    Validating,
    Committing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::PrevCheck => "previous hash check",
            Self::Validating => "validation",
            Self::Committing => "commit",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum RejectReason {
    /// The block builds on an ancestor of our tip.
    Stale { height: u64, expected: u64 },
    Invalid(ValidationError),
    Store(StoreError),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale { height, expected } => {
                write!(f, "stale block at height {height}, expected {expected}")
            }
            Self::Invalid(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug)]
pub enum BlockOutcome {
    Accepted { hash: BlockHash, height: u64 },
    /// Already committed; nothing to do.
    AlreadyKnown { hash: BlockHash },
    /// The block is ahead of our chain or builds on a block we do not have.
    GapDetected { expected_height: u64, claimed_height: Option<u64> },
    Rejected { stage: PipelineStage, reason: RejectReason },
}

impl BlockOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    fn rejected(stage: PipelineStage, reason: RejectReason) -> Self {
        Self::Rejected { stage, reason }
    }
}

/// A block before validation: header, its non-coinbase transactions in
/// order, and the height the sender claims for it.
#[derive(Clone, Debug)]
pub struct InboundBlock {
    pub content: BlockContent,
    pub transactions: Vec<Transaction>,
    pub height: Option<u64>,
}

pub struct BlockPipeline {
    store: Arc<dyn LedgerStore>,
    mempool: Arc<Mutex<Mempool>>,
    /// The commit lock. Holds the difficulty window of the committed chain.
    chain: Mutex<DifficultyAdjuster>,
    params: ConsensusParams,
    clock: Arc<dyn Clock>,
    broadcaster: Broadcaster,
    recent: Arc<Mutex<RecentlySeen>>,
    metrics: Arc<NodeMetrics>,
}

impl BlockPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mempool: Arc<Mutex<Mempool>>,
        params: ConsensusParams,
        clock: Arc<dyn Clock>,
        broadcaster: Broadcaster,
        recent: Arc<Mutex<RecentlySeen>>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            chain: Mutex::new(DifficultyAdjuster::new(&params)),
            store,
            mempool,
            params,
            clock,
            broadcaster,
            recent,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Difficulty the next block must declare.
    pub async fn next_difficulty(&self) -> Result<Difficulty, StoreError> {
        let mut chain = self.chain.lock().await;
        let tip = self.store.tip()?;
        self.ensure_seeded(&mut chain, tip.as_ref())?;
        Ok(chain.next_difficulty())
    }

    /// Run `block` through every stage. Never panics on bad input; every
    /// failure is reported in the outcome.
    pub async fn process(&self, block: InboundBlock, source: BlockSource) -> BlockOutcome {
        let hash = block.content.hash();
        let span = block_process_span(&hash.to_hex(), source.label());
        let outcome = self.run(hash, block, &source).instrument(span).await;
        match &outcome {
            BlockOutcome::Accepted { height, .. } => {
                self.metrics.blocks_accepted.inc();
                self.metrics.chain_height.set(*height as i64);
            }
            BlockOutcome::Rejected { stage, reason } => {
                self.metrics.blocks_rejected.inc();
                warn!(%hash, %stage, %reason, "block rejected");
            }
            BlockOutcome::GapDetected { expected_height, claimed_height } => {
                debug!(%hash, expected_height, ?claimed_height, "block does not connect to tip");
            }
            BlockOutcome::AlreadyKnown { .. } => {}
        }
        outcome
    }

    async fn run(&self, hash: BlockHash, block: InboundBlock, source: &BlockSource) -> BlockOutcome {
        // Received
        match self.store.get_block_by_hash(&hash) {
            Ok(Some(_)) => return BlockOutcome::AlreadyKnown { hash },
            Ok(None) => {}
            Err(e) => return BlockOutcome::rejected(PipelineStage::Received, RejectReason::Store(e)),
        }

        let mut chain = self.chain.lock().await;

        // PrevCheck
        let tip = match self.store.tip() {
            Ok(tip) => tip,
            Err(e) => return BlockOutcome::rejected(PipelineStage::PrevCheck, RejectReason::Store(e)),
        };
        let (tip_hash, expected) = tip
            .as_ref()
            .map_or((BlockHash::ZERO, 1), |t| (t.hash, t.height + 1));
        if let Some(claimed) = block.height {
            if claimed < expected {
                // A racing push of the same block lands here once the first commits.
                if self.store.get_block_by_hash(&hash).ok().flatten().is_some() {
                    return BlockOutcome::AlreadyKnown { hash };
                }
                return BlockOutcome::rejected(
                    PipelineStage::PrevCheck,
                    RejectReason::Stale {
                        height: claimed,
                        expected,
                    },
                );
            }
            if claimed > expected {
                return BlockOutcome::GapDetected {
                    expected_height: expected,
                    claimed_height: Some(claimed),
                };
            }
        }
        if block.content.previous_hash != tip_hash {
            return match self.store.get_block_by_hash(&block.content.previous_hash) {
                Ok(Some(parent)) if parent.height + 1 < expected => BlockOutcome::rejected(
                    PipelineStage::PrevCheck,
                    RejectReason::Stale {
                        height: parent.height + 1,
                        expected,
                    },
                ),
                Ok(_) => BlockOutcome::GapDetected {
                    expected_height: expected,
                    claimed_height: block.height,
                },
                Err(e) => BlockOutcome::rejected(PipelineStage::PrevCheck, RejectReason::Store(e)),
            };
        }

        // Validating
        if let Err(e) = self.ensure_seeded(&mut chain, tip.as_ref()) {
            return BlockOutcome::rejected(PipelineStage::Validating, RejectReason::Store(e));
        }
        let difficulty = chain.next_difficulty();
        let full = match Block::with_coinbase(
            block.content,
            block.transactions,
            self.store.as_ref(),
            expected,
            &self.params,
        ) {
            Ok(full) => full,
            Err(e) => return BlockOutcome::rejected(PipelineStage::Validating, RejectReason::Invalid(e)),
        };
        let commit = match validate_block(&full, self.store.as_ref(), &self.params, difficulty, self.clock.now()) {
            Ok(commit) => commit,
            Err(e) => return BlockOutcome::rejected(PipelineStage::Validating, RejectReason::Invalid(e)),
        };

        // Committing
        if let Err(e) = self.store.commit_block(&commit) {
            if e.is_unique_conflict() {
                return BlockOutcome::AlreadyKnown { hash };
            }
            return BlockOutcome::rejected(PipelineStage::Committing, RejectReason::Store(e));
        }
        chain.record_block(sample(&commit.block));

        let confirmed: Vec<_> = commit.transactions.iter().map(|t| t.hash).collect();
        {
            let mut mempool = self.mempool.lock().await;
            let evicted = mempool.evict_confirmed(&confirmed, &commit.spent);
            self.metrics.mempool_size.set(mempool.len() as i64);
            debug!(evicted, "mempool updated");
        }
        drop(chain);

        let height = commit.block.height;
        info!(%hash, height, txs = commit.transactions.len(), reward = %commit.block.reward, "block accepted");

        if *source != BlockSource::Sync && self.recent.lock().await.insert(*hash.as_bytes()) {
            self.broadcaster.submit(PropagationJob {
                path: "push_block".into(),
                body: json!({
                    "block_content": full.content.to_hex(),
                    "txs": full.regular().map(Transaction::to_hex).collect::<Vec<_>>(),
                    "block_no": height,
                }),
                exclude: source.origin().map(str::to_string),
            });
        }

        BlockOutcome::Accepted { hash, height }
    }

    /// Reload the difficulty window if it does not end at `tip`.
    fn ensure_seeded(&self, chain: &mut DifficultyAdjuster, tip: Option<&BlockRecord>) -> Result<(), StoreError> {
        let current = chain.tip().map(|s| s.height);
        if current == tip.map(|t| t.height) {
            return Ok(());
        }
        *chain = DifficultyAdjuster::new(&self.params);
        let Some(tip) = tip else {
            return Ok(());
        };
        let mut offset = tip.height.saturating_sub(chain.window_len());
        while offset < tip.height {
            let page = self.store.get_blocks(offset, 1_000)?;
            let Some(last) = page.last() else { break };
            offset = last.height;
            for record in &page {
                chain.record_block(sample(record));
            }
        }
        debug!(height = tip.height, "difficulty window seeded");
        Ok(())
    }
}

fn sample(record: &BlockRecord) -> ChainSample {
    ChainSample {
        height: record.height,
        timestamp: record.timestamp.as_secs(),
        difficulty: record.difficulty,
    }
}
