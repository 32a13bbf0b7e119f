//! RPC request handlers. Every route answers GET (query string) and POST
//! (JSON body) alike.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use denaro_network::SENDER_HEADER;
use denaro_node::{DenaroNode, PushBlockOutcome, PushBlockRequest, SyncStart, TxOutcome};

use crate::envelope::{ApiResponse, Params};
use crate::error::RpcError;

type RpcResult = Result<Json<ApiResponse>, RpcError>;

fn ok<T: serde::Serialize>(result: T) -> RpcResult {
    ApiResponse::ok(result).map(Json)
}

fn sender(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SENDER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

// ── Node ─────────────────────────────────────────────────────────────────

pub async fn info(State(node): State<Arc<DenaroNode>>) -> RpcResult {
    ok(node.info()?)
}

pub async fn metrics(State(node): State<Arc<DenaroNode>>) -> Result<Response, RpcError> {
    if !node.config().enable_metrics {
        return Err(RpcError::MetricsDisabled);
    }
    let text = node
        .metrics()
        .encode()
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response())
}

// ── Transactions ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PushTxParams {
    pub tx_hex: String,
}

pub async fn push_tx(
    State(node): State<Arc<DenaroNode>>,
    headers: HeaderMap,
    Params(params): Params<PushTxParams>,
) -> RpcResult {
    match node.push_tx(&params.tx_hex, sender(&headers)).await {
        TxOutcome::Accepted(hash) => ok(json!({ "accepted": true, "hash": hash.to_hex() })),
        TxOutcome::AlreadyPresent(hash) => ok(json!({
            "accepted": false,
            "hash": hash.to_hex(),
            "reason": "Transaction already present",
        })),
        TxOutcome::Rejected(reason) => Ok(Json(ApiResponse::fail(reason))),
    }
}

pub async fn get_pending_transactions(State(node): State<Arc<DenaroNode>>) -> RpcResult {
    ok(node.get_pending_transactions().await)
}

#[derive(Deserialize)]
pub struct TransactionParams {
    pub tx_hash: String,
    #[serde(default)]
    pub verify: bool,
}

pub async fn get_transaction(
    State(node): State<Arc<DenaroNode>>,
    Params(params): Params<TransactionParams>,
) -> RpcResult {
    match node.get_transaction(&params.tx_hash, params.verify).await? {
        Some(tx) => ok(tx),
        None => Err(RpcError::NotFound(format!("transaction {}", params.tx_hash))),
    }
}

// ── Blocks ───────────────────────────────────────────────────────────────

/// `txs` is a JSON list on POST and a comma-separated list on GET.
#[derive(Default, Deserialize)]
#[serde(untagged)]
pub enum TxList {
    List(Vec<String>),
    Joined(String),
    #[default]
    Empty,
}

impl TxList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(txs) => txs,
            Self::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Empty => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
pub struct PushBlockParams {
    pub block_content: String,
    #[serde(default)]
    pub txs: TxList,
    #[serde(default, alias = "id")]
    pub block_no: Option<u64>,
}

pub async fn push_block(
    State(node): State<Arc<DenaroNode>>,
    headers: HeaderMap,
    Params(params): Params<PushBlockParams>,
) -> RpcResult {
    let request = PushBlockRequest {
        block_content: params.block_content,
        txs: params.txs.into_vec(),
        block_no: params.block_no,
    };
    match node.push_block(request, sender(&headers)).await {
        PushBlockOutcome::Accepted { hash, height } => {
            ok(json!({ "accepted": true, "hash": hash, "block_no": height }))
        }
        PushBlockOutcome::AlreadyKnown { hash } => ok(json!({
            "accepted": false,
            "hash": hash,
            "reason": "Block already known",
        })),
        PushBlockOutcome::SyncTriggered { reason } => ok(json!({
            "accepted": false,
            "reason": format!("{reason}; syncing, the block may have been accepted"),
        })),
        PushBlockOutcome::Rejected { reason } => Ok(Json(ApiResponse::fail(reason))),
    }
}

pub async fn get_mining_info(State(node): State<Arc<DenaroNode>>) -> RpcResult {
    ok(node.get_mining_info().await?)
}

#[derive(Deserialize)]
pub struct BlockParams {
    pub block: String,
    #[serde(default)]
    pub full_transactions: bool,
}

pub async fn get_block(State(node): State<Arc<DenaroNode>>, Params(params): Params<BlockParams>) -> RpcResult {
    match node.get_block(&params.block, params.full_transactions)? {
        Some(block) => ok(block),
        None => Err(RpcError::NotFound(format!("block {}", params.block))),
    }
}

fn default_blocks_limit() -> usize {
    100
}

#[derive(Deserialize)]
pub struct BlocksParams {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_blocks_limit")]
    pub limit: usize,
}

pub async fn get_blocks(State(node): State<Arc<DenaroNode>>, Params(params): Params<BlocksParams>) -> RpcResult {
    ok(node.get_blocks(params.offset, params.limit)?)
}

// ── Addresses ────────────────────────────────────────────────────────────

fn default_transactions_limit() -> usize {
    5
}

#[derive(Deserialize)]
pub struct AddressParams {
    pub address: String,
    #[serde(default = "default_transactions_limit")]
    pub transactions_count_limit: usize,
    #[serde(default)]
    pub show_pending: bool,
    #[serde(default)]
    pub verify: bool,
}

pub async fn get_address_info(
    State(node): State<Arc<DenaroNode>>,
    Params(params): Params<AddressParams>,
) -> RpcResult {
    ok(node
        .get_address_info(
            &params.address,
            params.transactions_count_limit,
            params.show_pending,
            params.verify,
        )
        .await?)
}

// ── Peers ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddNodeParams {
    pub url: String,
}

pub async fn add_node(State(node): State<Arc<DenaroNode>>, Params(params): Params<AddNodeParams>) -> RpcResult {
    let url = node.add_node(&params.url).await?;
    ok(json!({ "url": url }))
}

pub async fn get_nodes(State(node): State<Arc<DenaroNode>>) -> RpcResult {
    ok(node.get_nodes().await)
}

#[derive(Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub node_url: Option<String>,
}

pub async fn sync_blockchain(State(node): State<Arc<DenaroNode>>, Params(params): Params<SyncParams>) -> RpcResult {
    match node.sync_blockchain(params.node_url)? {
        SyncStart::Started => ok(json!({ "status": SyncStart::Started })),
        SyncStart::AlreadySyncing => Ok(Json(ApiResponse::fail("Node is already syncing"))),
    }
}
