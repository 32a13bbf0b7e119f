//! HTTP-level tests: the router against an in-memory node.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use denaro_crypto::{derive_address, keypair_from_seed};
use denaro_node::{DenaroNode, NodeConfig};
use denaro_nullables::{NullClock, NullNetwork, NullStore};
use denaro_rpc::router;
use denaro_transactions::{merkle_root, BlockContent};
use denaro_types::{BlockHash, Difficulty, NetworkId};
use denaro_work::WorkGenerator;

const NOW: u64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn app_with(enable_metrics: bool) -> (Router, Arc<NullNetwork>) {
    let config = NodeConfig {
        network: NetworkId::Regtest,
        self_url: Some("http://me".into()),
        enable_metrics,
        ..NodeConfig::default()
    };
    let net = Arc::new(NullNetwork::new());
    let node = DenaroNode::with_parts(
        config,
        Arc::new(NullStore::new()),
        net.clone(),
        Arc::new(NullClock::new(NOW)),
    )
    .await
    .expect("node");
    (router(node), net)
}

async fn app() -> Router {
    app_with(false).await.0
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Mine an empty block on the current tip, as a miner would over HTTP.
async fn mine_empty(app: &Router, seed: u8) -> Value {
    let (_, info) = get(app, "/get_mining_info").await;
    let info = &info["result"];
    let (prev, height) = match info["last_block"].as_object() {
        Some(last) => (
            BlockHash::from_hex(last["hash"].as_str().unwrap()).unwrap(),
            last["id"].as_u64().unwrap() + 1,
        ),
        None => (BlockHash::ZERO, 1),
    };
    let difficulty = info["difficulty"].as_f64().unwrap();
    let content = BlockContent {
        previous_hash: prev,
        miner: keypair_from_seed(&[seed; 32]).public,
        merkle_root: merkle_root(&[]),
        timestamp: (NOW - 10_000 + height * 180) as u32,
        difficulty: Difficulty::from_tenths((difficulty * 10.0).round() as u16),
        nonce: 0,
    };
    let content = WorkGenerator.mine(&content).unwrap();
    let (status, body) = post(
        app,
        "/push_block",
        json!({ "block_content": content.to_hex(), "txs": [], "block_no": height }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

// ---------------------------------------------------------------------------
// Envelope and parameters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_reports_height() {
    let app = app().await;
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["height"], 0);
    // SHA-256 of the empty string: nothing is unspent yet
    assert_eq!(
        body["result"]["unspent_outputs_hash"],
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[tokio::test]
async fn missing_parameter_is_a_bad_request() {
    let app = app().await;
    let (status, body) = get(&app, "/push_tx").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let request = Request::post("/get_block")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn post_without_body_reads_the_query() {
    let app = app().await;
    let request = Request::post("/get_blocks?offset=0&limit=5").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!([]));
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn garbage_transaction_is_refused_in_the_envelope() {
    let app = app().await;
    let (status, body) = post(&app, "/push_tx", json!({ "tx_hex": "zz" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let app = app().await;
    let uri = format!("/get_transaction?tx_hash={}", "ab".repeat(32));
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn pending_list_starts_empty() {
    let app = app().await;
    let (_, body) = get(&app, "/get_pending_transactions").await;
    assert_eq!(body, json!({ "ok": true, "result": [] }));
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mined_block_is_served_back() {
    let app = app().await;
    let pushed = mine_empty(&app, 7).await;
    assert_eq!(pushed["ok"], true);
    assert_eq!(pushed["result"]["accepted"], true);
    assert_eq!(pushed["result"]["block_no"], 1);

    let (status, block) = get(&app, "/get_block?block=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block["result"]["block"]["id"], 1);
    assert_eq!(block["result"]["block"]["hash"], pushed["result"]["hash"]);

    let (_, blocks) = get(&app, "/get_blocks?offset=0&limit=10").await;
    assert_eq!(blocks["result"].as_array().unwrap().len(), 1);

    let address = derive_address(&keypair_from_seed(&[7; 32]).public);
    let (_, info) = post(&app, "/get_address_info", json!({ "address": address.as_str() })).await;
    assert_eq!(info["ok"], true);
    assert_eq!(info["result"]["spendable_outputs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn pushing_the_same_block_twice_is_not_an_error() {
    let app = app().await;
    let (_, info) = get(&app, "/get_mining_info").await;
    assert!(info["result"]["last_block"].is_null());
    mine_empty(&app, 3).await;

    let (_, block) = get(&app, "/get_block?block=1").await;
    let content = block["result"]["block"]["content"].as_str().unwrap().to_string();
    let (status, again) = post(&app, "/push_block", json!({ "block_content": content, "id": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["ok"], true);
    assert_eq!(again["result"]["accepted"], false);
}

#[tokio::test]
async fn unknown_block_is_not_found() {
    let app = app().await;
    let (status, body) = get(&app, "/get_block?block=42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn added_node_is_listed() {
    let app = app().await;
    let (status, added) = post(&app, "/add_node", json!({ "url": "http://peer-a:3006/" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["result"]["url"], "http://peer-a:3006");

    let (_, nodes) = get(&app, "/get_nodes").await;
    let urls: Vec<&str> = nodes["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, vec!["http://peer-a:3006"]);
}

#[tokio::test]
async fn unreachable_node_is_refused() {
    let (app, net) = app_with(false).await;
    net.set_unreachable("http://down:3006");
    let (status, body) = get(&app, "/add_node?url=http://down:3006").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_are_hidden_unless_enabled() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_expose_prometheus_text() {
    let (app, _) = app_with(true).await;
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("denaro_"));
}
