//! A wallet driving a real RPC server backed by an in-memory node.

use std::sync::Arc;

use denaro_crypto::{derive_address, keypair_from_seed};
use denaro_node::{DenaroNode, NodeConfig, PushBlockRequest};
use denaro_nullables::{NullClock, NullNetwork, NullStore};
use denaro_transactions::{merkle_root, BlockContent};
use denaro_types::{Address, Amount, BlockHash, Difficulty, NetworkId};
use denaro_wallet_core::{NodeClient, SelectionError, Wallet, WalletError};
use denaro_work::WorkGenerator;

const NOW: u64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn serve_node() -> (Arc<DenaroNode>, String) {
    let config = NodeConfig {
        network: NetworkId::Regtest,
        ..NodeConfig::default()
    };
    let node = DenaroNode::with_parts(
        config,
        Arc::new(NullStore::new()),
        Arc::new(NullNetwork::new()),
        Arc::new(NullClock::new(NOW)),
    )
    .await
    .unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let app = denaro_rpc::router(node.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (node, url)
}

/// Mine an empty block paying `miner`.
async fn mine_to(node: &Arc<DenaroNode>, miner: &Address) {
    let info = node.get_mining_info().await.unwrap();
    let (prev, height) = match &info.last_block {
        Some(b) => (BlockHash::from_hex(&b.hash).unwrap(), b.id + 1),
        None => (BlockHash::ZERO, 1),
    };
    let content = BlockContent {
        previous_hash: prev,
        miner: denaro_crypto::decode_address(miner).unwrap(),
        merkle_root: merkle_root(&[]),
        timestamp: (NOW - 10_000 + height * 180) as u32,
        difficulty: Difficulty::from_tenths((info.difficulty * 10.0).round() as u16),
        nonce: 0,
    };
    let content = WorkGenerator.mine(&content).unwrap();
    let outcome = node
        .push_block(
            PushBlockRequest {
                block_content: content.to_hex(),
                txs: Vec::new(),
                block_no: Some(height),
            },
            None,
        )
        .await;
    assert!(outcome.is_accepted(), "{outcome:?}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_addresses_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallet.json");
    let client = NodeClient::new("http://127.0.0.1:1").unwrap();

    let mut wallet = Wallet::open(&path, client.clone()).unwrap();
    let address = wallet.create_address().unwrap();

    let reopened = Wallet::open(&path, client).unwrap();
    assert_eq!(reopened.addresses(), vec![address]);
}

#[tokio::test]
async fn send_spends_and_reserves_outputs() {
    let (node, url) = serve_node().await;
    let dir = tempfile::tempdir().unwrap();
    let mut wallet = Wallet::open(dir.path().join("wallet.json"), NodeClient::new(&url).unwrap()).unwrap();
    let me = wallet.create_address().unwrap();
    mine_to(&node, &me).await;

    let balances = wallet.balances().await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].balance, Amount::from_coins(100));
    assert_eq!(balances[0].pending_balance, Amount::from_coins(100));

    let bob = derive_address(&keypair_from_seed(&[2; 32]).public);
    let sent = wallet.send(bob.as_str(), "30", Some("hi"), None).await.unwrap();
    assert_eq!(sent.inputs, 1);
    assert_eq!(sent.change, Amount::from_coins(70));
    assert_eq!(node.get_pending_transactions().await.len(), 1);

    let balances = wallet.balances().await.unwrap();
    assert_eq!(balances[0].balance, Amount::from_coins(100));
    assert_eq!(balances[0].pending_balance, Amount::from_coins(70));

    // The only output is reserved by the pending payment.
    let err = wallet.send(bob.as_str(), "1", None, None).await.unwrap_err();
    assert!(matches!(err, WalletError::Selection(SelectionError::NoSpendableOutputs)));
}

#[tokio::test]
async fn send_without_funds_reports_shortfall() {
    let (node, url) = serve_node().await;
    let dir = tempfile::tempdir().unwrap();
    let mut wallet = Wallet::open(dir.path().join("wallet.json"), NodeClient::new(&url).unwrap()).unwrap();
    let me = wallet.create_address().unwrap();
    mine_to(&node, &me).await;

    let err = wallet.send(me.as_str(), "150", None, None).await.unwrap_err();
    assert!(matches!(
        err,
        WalletError::Selection(SelectionError::InsufficientFunds { shortfall }) if shortfall == Amount::from_coins(50)
    ));
}

#[tokio::test]
async fn bad_recipient_is_refused_locally() {
    let (_node, url) = serve_node().await;
    let dir = tempfile::tempdir().unwrap();
    let mut wallet = Wallet::open(dir.path().join("wallet.json"), NodeClient::new(&url).unwrap()).unwrap();
    wallet.create_address().unwrap();
    let err = wallet.send("dnr_nope", "1", None, None).await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}
