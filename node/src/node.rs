//! The node facade: wires the ledger, mempool, pipeline, peers and
//! synchronizer together and exposes one method per RPC operation.
//!
//! Lock order is commit lock, then mempool, then recent-hash cache. No lock is
//! held across a network call.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use denaro_crypto::{sha256, validate_address};
use denaro_mempool::{Mempool, MempoolError};
use denaro_network::{
    normalize_url, run_broadcast_worker, Broadcaster, HttpTransport, PeerNode, PeerRegistry, PeerTransport,
    Peers, PropagationJob, Propagator, RecentlySeen, SyncError, DEFAULT_QUEUE_DEPTH, RECENT_PEERS_LIMIT,
};
use denaro_store::{BlockId, LedgerStore, PeerStore};
use denaro_store_lmdb::LmdbLedger;
use denaro_transactions::{merkle_root, BlockContent, LedgerTransaction};
use denaro_types::{Amount, Clock, ConsensusParams, SystemClock, TxHash};

use crate::api::{
    AddressInfo, BlockDetail, BlockEntry, BlockTransactions, BlockView, MiningInfo, NodeInfo, PendingSpend,
    PushBlockOutcome, PushBlockRequest, SyncStart, TxOutcome, TxRef, TxView, UnspentView,
};
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::pipeline::{BlockOutcome, BlockPipeline, BlockSource, InboundBlock};
use crate::shutdown::ShutdownController;
use crate::sync::{ChainSynchronizer, SyncGuard, SyncReport};
use crate::tracing_spans::rpc_span;

/// Most committed transactions `get_address_info` returns.
pub const MAX_ADDRESS_TRANSACTIONS: usize = 50;

/// Most blocks one `get_blocks` call returns.
pub const MAX_BLOCKS_PER_REQUEST: usize = 1_000;

pub struct DenaroNode {
    config: NodeConfig,
    params: ConsensusParams,
    store: Arc<dyn LedgerStore>,
    mempool: Arc<Mutex<Mempool>>,
    pipeline: BlockPipeline,
    sync: ChainSynchronizer,
    peers: Arc<Peers>,
    transport: Arc<dyn PeerTransport>,
    broadcaster: Broadcaster,
    broadcast_rx: StdMutex<Option<mpsc::Receiver<PropagationJob>>>,
    recent: Arc<Mutex<RecentlySeen>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<NodeMetrics>,
    shutdown: ShutdownController,
}

impl DenaroNode {
    /// Open the LMDB ledger under `config.data_dir` and talk to peers over HTTP.
    pub async fn open(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = Arc::new(LmdbLedger::open(&config.data_dir, denaro_store_lmdb::environment::DEFAULT_MAP_SIZE)?);
        let transport = HttpTransport::new(
            Duration::from_secs(config.propagation_timeout_secs),
            Duration::from_secs(config.probe_timeout_secs),
        )?;
        info!(data_dir = %config.data_dir.display(), network = config.network.as_str(), "ledger opened");
        Self::with_parts(config, store, Arc::new(transport), Arc::new(SystemClock)).await
    }

    /// Build a node from explicit parts. Tests pass in-memory ones.
    pub async fn with_parts<S>(
        config: NodeConfig,
        store: Arc<S>,
        transport: Arc<dyn PeerTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, NodeError>
    where
        S: LedgerStore + 'static,
    {
        let params = config.params();
        let metrics = Arc::new(NodeMetrics::new()?);

        let peer_store: Arc<dyn PeerStore + Send + Sync> = store.clone();
        let peers = Arc::new(Peers::new(
            PeerRegistry::new(config.self_url.as_deref(), config.max_peers),
            peer_store,
            Propagator::new(transport.clone(), Duration::from_secs(config.propagation_timeout_secs)),
            Duration::from_secs(config.probe_timeout_secs),
        ));
        let loaded = peers.load(&config.bootstrap_peers, clock.now().as_secs()).await?;
        metrics.peer_count.set(loaded as i64);

        let store: Arc<dyn LedgerStore> = store;
        let mempool = Arc::new(Mutex::new(Mempool::new(config.mempool_max_size)));
        let recent = Arc::new(Mutex::new(RecentlySeen::new(config.recent_cache_capacity)));
        let (broadcaster, rx) = Broadcaster::channel(DEFAULT_QUEUE_DEPTH);
        let pipeline = BlockPipeline::new(
            store.clone(),
            mempool.clone(),
            params.clone(),
            clock.clone(),
            broadcaster.clone(),
            recent.clone(),
            metrics.clone(),
        );
        if let Some(tip) = store.tip()? {
            metrics.chain_height.set(tip.height as i64);
        }

        Ok(Arc::new(Self {
            config,
            params,
            store,
            mempool,
            pipeline,
            sync: ChainSynchronizer::default(),
            peers,
            transport,
            broadcaster,
            broadcast_rx: StdMutex::new(Some(rx)),
            recent,
            clock,
            metrics,
            shutdown: ShutdownController::new(),
        }))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    /// Start the propagation worker and the mempool prune loop. Call once;
    /// later calls only start another prune loop.
    pub fn spawn_background(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        let rx = self
            .broadcast_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(rx) = rx {
            let metrics = self.metrics.clone();
            handles.push(tokio::spawn(run_broadcast_worker(
                rx,
                self.peers.clone(),
                self.shutdown.subscribe(),
                move |_job, report| metrics.propagation_failures.inc_by(report.failed as u64),
            )));
        }

        let node = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(node.config.prune_interval_secs.max(1)));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = node.prune_mempool().await {
                            warn!(error = %e, "mempool prune failed");
                        }
                    }
                }
            }
            debug!("prune loop stopped");
        }));
        handles
    }

    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Drop stale and unfundable pending transactions.
    pub async fn prune_mempool(&self) -> Result<usize, NodeError> {
        let now = self.clock.now();
        let mut pool = self.mempool.lock().await;
        let removed = pool.prune(self.config.pending_max_age_secs, now, self.store.as_ref())?;
        self.metrics.mempool_size.set(pool.len() as i64);
        if removed > 0 {
            info!(removed, remaining = pool.len(), "mempool pruned");
        }
        Ok(removed)
    }

    pub fn info(&self) -> Result<NodeInfo, NodeError> {
        Ok(NodeInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            network: self.config.network.as_str().to_string(),
            height: self.store.next_height()? - 1,
            unspent_outputs_hash: self.unspent_outputs_hash()?,
        })
    }

    /// SHA-256 over the hex of every unspent `tx_hash` followed by its index
    /// byte, in outpoint order.
    pub fn unspent_outputs_hash(&self) -> Result<String, NodeError> {
        let mut joined = String::new();
        for op in self.store.unspent_outpoints()? {
            joined.push_str(&op.tx_hash.to_hex());
            joined.push_str(&hex::encode([op.index]));
        }
        Ok(hex::encode(sha256(joined.as_bytes())))
    }

    async fn touch_sender(&self, sender: Option<&str>) {
        if let Some(url) = sender {
            if let Err(e) = self.peers.touch(url, self.clock.now().as_secs()).await {
                debug!(%url, error = %e, "could not refresh sender");
            }
        }
    }

    /// Queue `body` for fan-out unless `hash` was already relayed.
    async fn relay(&self, hash: [u8; 32], path: &str, body: serde_json::Value, exclude: Option<&str>) {
        if self.recent.lock().await.insert(hash) {
            self.broadcaster.submit(PropagationJob {
                path: path.to_string(),
                body,
                exclude: exclude.map(str::to_string),
            });
        }
    }

    pub async fn push_tx(&self, tx_hex: &str, sender: Option<&str>) -> TxOutcome {
        async {
            self.touch_sender(sender).await;
            let tx = match LedgerTransaction::from_hex(tx_hex.trim()) {
                Ok(LedgerTransaction::Regular(tx)) => tx,
                Ok(LedgerTransaction::Coinbase(_)) => {
                    return TxOutcome::Rejected("coinbase transactions cannot be pushed".into());
                }
                Err(e) => return TxOutcome::Rejected(format!("could not decode transaction: {e}")),
            };

            let admitted = {
                let mut pool = self.mempool.lock().await;
                let admitted = pool.admit(tx, self.store.as_ref(), &self.params, self.clock.now());
                self.metrics.mempool_size.set(pool.len() as i64);
                admitted
            };
            match admitted {
                Ok(hash) => {
                    self.metrics.transactions_accepted.inc();
                    info!(%hash, "transaction accepted");
                    let body = json!({ "tx_hex": tx_hex.trim() });
                    self.relay(*hash.as_bytes(), "push_tx", body, sender).await;
                    TxOutcome::Accepted(hash)
                }
                Err(MempoolError::AlreadyPresent(hash)) => TxOutcome::AlreadyPresent(hash),
                Err(e) => {
                    self.metrics.transactions_rejected.inc();
                    debug!(error = %e, "transaction rejected");
                    TxOutcome::Rejected(e.to_string())
                }
            }
        }
        .instrument(rpc_span("push_tx"))
        .await
    }

    pub async fn push_block(self: &Arc<Self>, request: PushBlockRequest, sender: Option<&str>) -> PushBlockOutcome {
        async {
            self.touch_sender(sender).await;
            let content = match BlockContent::from_hex(request.block_content.trim()) {
                Ok(content) => content,
                Err(e) => {
                    return PushBlockOutcome::Rejected {
                        reason: format!("could not decode block content: {e}"),
                    }
                }
            };

            let mut transactions = Vec::with_capacity(request.txs.len());
            let mut missing = 0usize;
            {
                let pool = self.mempool.lock().await;
                for entry in &request.txs {
                    match TxRef::parse(entry) {
                        Ok(TxRef::Inline(tx)) => transactions.push(tx),
                        Ok(TxRef::Known(hash)) => match pool.get(&hash) {
                            Some(pending) => transactions.push(pending.tx.clone()),
                            None => missing += 1,
                        },
                        Err(reason) => return PushBlockOutcome::Rejected { reason },
                    }
                }
            }
            if missing > 0 {
                self.trigger_sync(sender.map(str::to_string));
                return PushBlockOutcome::SyncTriggered {
                    reason: format!("{missing} transactions referenced by hash are unknown"),
                };
            }

            let block = InboundBlock {
                content,
                transactions,
                height: request.block_no,
            };
            let source = BlockSource::Push {
                origin: sender.map(str::to_string),
            };
            match self.pipeline.process(block, source).await {
                BlockOutcome::Accepted { hash, height } => PushBlockOutcome::Accepted {
                    hash: hash.to_hex(),
                    height,
                },
                BlockOutcome::AlreadyKnown { hash } => PushBlockOutcome::AlreadyKnown { hash: hash.to_hex() },
                BlockOutcome::GapDetected { expected_height, .. } => {
                    self.trigger_sync(sender.map(str::to_string));
                    PushBlockOutcome::SyncTriggered {
                        reason: format!("block does not connect to local chain at height {expected_height}"),
                    }
                }
                BlockOutcome::Rejected { stage, reason } => PushBlockOutcome::Rejected {
                    reason: format!("{stage}: {reason}"),
                },
            }
        }
        .instrument(rpc_span("push_block"))
        .await
    }

    pub async fn get_mining_info(&self) -> Result<MiningInfo, NodeError> {
        let difficulty = self.pipeline.next_difficulty().await?;
        let last_block = self.store.tip()?.as_ref().map(BlockView::from);

        let mut pool = self.mempool.lock().await;
        match pool.maybe_prune(
            self.config.prune_interval_secs,
            self.config.pending_max_age_secs,
            self.clock.now(),
            self.store.as_ref(),
        ) {
            Ok(Some(removed)) if removed > 0 => info!(removed, "mempool pruned"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "mempool prune failed"),
        }
        self.metrics.mempool_size.set(pool.len() as i64);

        let all = pool.list(usize::MAX);
        let candidates = candidates_within(&all, self.params.mining_candidates, self.params.max_block_size);
        let candidate_hashes: Vec<TxHash> = candidates.iter().map(|p| p.hash).collect();
        Ok(MiningInfo {
            difficulty: difficulty.as_f64(),
            last_block,
            pending_transactions: candidates.iter().map(|p| p.hex.clone()).collect(),
            pending_transactions_hashes: all.iter().map(|p| p.hash.to_hex()).collect(),
            merkle_root: hex::encode(merkle_root(&candidate_hashes)),
        })
    }

    pub async fn get_address_info(
        &self,
        address: &str,
        transactions_count_limit: usize,
        show_pending: bool,
        verify: bool,
    ) -> Result<AddressInfo, NodeError> {
        let address = validate_address(address).map_err(|e| NodeError::BadRequest(e.to_string()))?;
        let limit = transactions_count_limit.min(MAX_ADDRESS_TRANSACTIONS);

        let unspent = self.store.get_unspent(&address)?;
        let committed = Amount::checked_sum(unspent.iter().map(|u| u.amount))
            .ok_or_else(|| NodeError::BadRequest("balance overflows".into()))?;
        let transactions = self
            .store
            .get_address_transactions(&address, limit)?
            .iter()
            .filter_map(|record| TxView::committed(record, verify))
            .collect();

        let pool = self.mempool.lock().await;
        let spendable_outputs = unspent
            .iter()
            .filter(|u| !pool.is_reserved(&u.outpoint()))
            .map(UnspentView::from)
            .collect();
        let balance = if show_pending {
            pool.pending_balance(&address, committed)
        } else {
            committed
        };
        let (pending_transactions, pending_spent_outputs) = if show_pending {
            let txs = pool.touching(&address).into_iter().map(|p| TxView::pending(p, verify)).collect();
            let spent = pool
                .reserved_outpoints(Some(&address))
                .into_iter()
                .map(|op| PendingSpend {
                    tx_hash: op.tx_hash.to_hex(),
                    index: op.index,
                })
                .collect();
            (Some(txs), Some(spent))
        } else {
            (None, None)
        };

        Ok(AddressInfo {
            balance: balance.to_string(),
            spendable_outputs,
            transactions,
            pending_transactions,
            pending_spent_outputs,
        })
    }

    /// Probe and register a peer, then tell the other peers about it.
    pub async fn add_node(&self, url: &str) -> Result<String, NodeError> {
        let url = self.peers.add_peer(url, self.clock.now().as_secs()).await?;
        self.metrics.peer_count.set(self.peers.len().await as i64);
        self.broadcaster.submit(PropagationJob {
            path: "add_node".into(),
            body: json!({ "url": url }),
            exclude: Some(url.clone()),
        });
        Ok(url)
    }

    pub async fn get_nodes(&self) -> Vec<PeerNode> {
        self.peers.recent(RECENT_PEERS_LIMIT).await
    }

    /// Start a background sync, from `node_url` if given, else from the
    /// registry. Returns immediately.
    pub fn sync_blockchain(self: &Arc<Self>, node_url: Option<String>) -> Result<SyncStart, NodeError> {
        let hint = node_url
            .map(|url| normalize_url(&url))
            .transpose()?;
        Ok(self.trigger_sync(hint))
    }

    /// Run a sync to completion on the caller's task.
    pub async fn sync_now(&self, node_url: Option<String>) -> Result<SyncReport, SyncError> {
        let guard = self.sync.try_begin().ok_or(SyncError::AlreadySyncing)?;
        self.run_sync(guard, node_url).await
    }

    fn trigger_sync(self: &Arc<Self>, hint: Option<String>) -> SyncStart {
        let Some(guard) = self.sync.try_begin() else {
            return SyncStart::AlreadySyncing;
        };
        let node = Arc::clone(self);
        tokio::spawn(async move {
            match node.run_sync(guard, hint).await {
                Ok(report) => debug!(?report, "background sync done"),
                Err(e) => warn!(error = %e, "background sync stopped"),
            }
        });
        SyncStart::Started
    }

    async fn run_sync(&self, guard: SyncGuard, hint: Option<String>) -> Result<SyncReport, SyncError> {
        self.metrics.sync_runs.inc();
        let peers = match hint {
            Some(url) => vec![url],
            None => self.peers.sync_candidates().await,
        };
        let report = self
            .sync
            .run(&guard, &self.pipeline, self.transport.as_ref(), &peers)
            .await;
        drop(guard);
        report
    }

    /// Every pending transaction as hex, in listing order.
    pub async fn get_pending_transactions(&self) -> Vec<String> {
        self.mempool
            .lock()
            .await
            .list(usize::MAX)
            .into_iter()
            .map(|p| p.hex.clone())
            .collect()
    }

    /// A committed or pending transaction.
    pub async fn get_transaction(&self, hash: &str, verify: bool) -> Result<Option<TxView>, NodeError> {
        let hash = TxHash::from_hex(hash.trim()).map_err(|e| NodeError::BadRequest(e.to_string()))?;
        if let Some(record) = self.store.get_transaction(&hash)? {
            return Ok(TxView::committed(&record, verify));
        }
        Ok(self
            .mempool
            .lock()
            .await
            .get(&hash)
            .map(|p| TxView::pending(p, verify)))
    }

    /// A block by height or hash, with its transactions (coinbase first).
    pub fn get_block(&self, id: &str, full_transactions: bool) -> Result<Option<BlockDetail>, NodeError> {
        let id: BlockId = id
            .trim()
            .parse()
            .map_err(|e: denaro_types::DenaroError| NodeError::BadRequest(e.to_string()))?;
        let Some(record) = self.store.get_block(id)? else {
            return Ok(None);
        };
        let records = self.store.get_block_transactions(&record.hash)?;
        let transactions = if full_transactions {
            BlockTransactions::Full(records.iter().filter_map(|r| TxView::committed(r, false)).collect())
        } else {
            BlockTransactions::Hex(records.iter().map(|r| hex::encode(&r.bytes)).collect())
        };
        Ok(Some(BlockDetail {
            block: BlockView::from(&record),
            transactions,
        }))
    }

    /// Blocks above height `offset`, in order, replayable by a syncing peer.
    pub fn get_blocks(&self, offset: u64, limit: usize) -> Result<Vec<BlockEntry>, NodeError> {
        let limit = limit.min(MAX_BLOCKS_PER_REQUEST);
        let mut entries = Vec::new();
        for record in self.store.get_blocks(offset, limit)? {
            let transactions = self
                .store
                .get_block_transactions(&record.hash)?
                .into_iter()
                .filter(|r| !r.is_coinbase)
                .map(|r| hex::encode(r.bytes))
                .collect();
            entries.push(BlockEntry {
                block: BlockView::from(&record),
                transactions,
            });
        }
        Ok(entries)
    }
}

/// The first `max` transactions of `listed` that fit in one block together.
fn candidates_within<'a>(
    listed: &[&'a denaro_mempool::PendingTransaction],
    max: usize,
    max_block_size: usize,
) -> Vec<&'a denaro_mempool::PendingTransaction> {
    let mut size = 0;
    let mut picked = Vec::new();
    for pending in listed {
        if picked.len() >= max {
            break;
        }
        let len = pending.hex.len() / 2;
        if size + len > max_block_size {
            continue;
        }
        size += len;
        picked.push(*pending);
    }
    picked
}
