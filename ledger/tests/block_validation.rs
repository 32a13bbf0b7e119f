//! Block validation against the in-memory ledger.

use denaro_crypto::{derive_address, keypair_from_seed};
use denaro_ledger::{block_reward, validate_block, Block, ValidationError};
use denaro_nullables::NullStore;
use denaro_store::{BlockStore, LedgerStore, UtxoStore};
use denaro_transactions::{
    merkle_root, BlockContent, CoinbaseTransaction, LedgerTransaction, Transaction, TransactionInput,
    TransactionOutput,
};
use denaro_types::{Amount, BlockHash, ConsensusParams, Difficulty, KeyPair, OutPoint, Timestamp, TxHash};

const NOW: u64 = 1_700_000_000;

fn params() -> ConsensusParams {
    ConsensusParams::regtest()
}

fn content(prev: BlockHash, miner: &KeyPair, txs: &[Transaction], timestamp: u32) -> BlockContent {
    let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();
    BlockContent {
        previous_hash: prev,
        miner: miner.public,
        merkle_root: merkle_root(&hashes),
        timestamp,
        difficulty: Difficulty::ZERO,
        nonce: 0,
    }
}

fn build(store: &NullStore, prev: BlockHash, miner: &KeyPair, txs: Vec<Transaction>, timestamp: u32) -> Block {
    let height = store.next_height().unwrap();
    let content = content(prev, miner, &txs, timestamp);
    Block::with_coinbase(content, txs, store, height, &params()).unwrap()
}

fn check(store: &NullStore, block: &Block) -> Result<denaro_store::BlockCommit, ValidationError> {
    validate_block(block, store, &params(), Difficulty::ZERO, Timestamp::new(NOW))
}

fn accept(store: &NullStore, block: &Block) {
    let commit = check(store, block).unwrap();
    store.commit_block(&commit).unwrap();
}

fn pay(owner: &KeyPair, inputs: &[OutPoint], outputs: &[(&KeyPair, u64)]) -> Transaction {
    let mut tx = Transaction::new(
        inputs.iter().map(|op| TransactionInput::unsigned(*op, owner.public)).collect(),
        outputs
            .iter()
            .map(|(to, coins)| TransactionOutput::new(to.public, Amount::from_coins(*coins)))
            .collect(),
        None,
    )
    .unwrap();
    tx.sign(std::slice::from_ref(owner)).unwrap();
    tx
}

fn coinbase_outpoint(block: &Block) -> OutPoint {
    OutPoint::new(block.transactions[0].hash(), 0)
}

/// Genesis mined by `miner`, committed.
fn genesis(store: &NullStore, miner: &KeyPair) -> Block {
    let block = build(store, BlockHash::ZERO, miner, vec![], (NOW - 1_000) as u32);
    accept(store, &block);
    block
}

// ---------------------------------------------------------------------------
// Accepted blocks
// ---------------------------------------------------------------------------

#[test]
fn genesis_pays_base_reward() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    genesis(&store, &alice);

    let tip = store.tip().unwrap().unwrap();
    assert_eq!(tip.height, 1);
    assert_eq!(tip.reward, block_reward(1, &params()));
    assert_eq!(
        store.get_balance(&derive_address(&alice.public)).unwrap(),
        Amount::from_coins(100)
    );
}

#[test]
fn later_transaction_may_spend_earlier_output_in_same_block() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let bob = keypair_from_seed(&[2; 32]);
    let carol = keypair_from_seed(&[3; 32]);
    let first = genesis(&store, &alice);

    let tx1 = pay(&alice, &[coinbase_outpoint(&first)], &[(&bob, 60), (&alice, 39)]);
    let bob_out = OutPoint::new(tx1.hash(), 0);
    let tx2 = pay(&bob, &[bob_out], &[(&carol, 59)]);
    let block = build(&store, first.content.hash(), &alice, vec![tx1, tx2], (NOW - 900) as u32);

    let commit = check(&store, &block).unwrap();
    // only the committed coinbase output leaves the ledger
    assert_eq!(commit.spent, vec![coinbase_outpoint(&first)]);
    assert!(!commit.created.iter().any(|u| u.outpoint() == bob_out));

    // fees: 1 + 1 on top of the base reward
    let fees = Amount::checked_sum(commit.transactions.iter().map(|t| t.fees)).unwrap();
    assert_eq!(fees, Amount::from_coins(2));
    assert_eq!(commit.block.reward, block_reward(2, &params()) + fees);

    store.commit_block(&commit).unwrap();
    assert_eq!(store.get_balance(&derive_address(&carol.public)).unwrap(), Amount::from_coins(59));
    assert_eq!(store.get_balance(&derive_address(&bob.public)).unwrap(), Amount::ZERO);
    assert_eq!(store.get_balance(&derive_address(&alice.public)).unwrap(), Amount::from_coins(141));
}

// ---------------------------------------------------------------------------
// Rejected blocks
// ---------------------------------------------------------------------------

#[test]
fn double_spend_inside_block_is_rejected() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let bob = keypair_from_seed(&[2; 32]);
    let first = genesis(&store, &alice);
    let op = coinbase_outpoint(&first);

    let tx1 = pay(&alice, &[op], &[(&bob, 100)]);
    let tx2 = pay(&alice, &[op], &[(&alice, 100)]);
    let hashes = [tx1.hash(), tx2.hash()];
    let content = content(first.content.hash(), &alice, &[tx1.clone(), tx2.clone()], (NOW - 900) as u32);
    let coinbase = CoinbaseTransaction::new(content.hash(), alice.public, block_reward(2, &params()));
    let block = Block {
        content,
        transactions: vec![
            LedgerTransaction::Coinbase(coinbase),
            LedgerTransaction::Regular(tx1),
            LedgerTransaction::Regular(tx2),
        ],
    };
    assert_ne!(hashes[0], hashes[1]);
    assert!(matches!(check(&store, &block), Err(ValidationError::InputNotFound(o)) if o == op));
}

#[test]
fn wrong_previous_hash_is_rejected() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    genesis(&store, &alice);
    let block = build(&store, BlockHash::new([9; 32]), &alice, vec![], (NOW - 900) as u32);
    assert!(matches!(check(&store, &block), Err(ValidationError::PreviousMismatch { .. })));
}

#[test]
fn timestamp_must_advance_and_not_run_ahead() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let first = genesis(&store, &alice);

    let same = build(&store, first.content.hash(), &alice, vec![], first.content.timestamp);
    assert!(matches!(check(&store, &same), Err(ValidationError::TimestampNotIncreasing { .. })));

    let ahead = build(&store, first.content.hash(), &alice, vec![], (NOW + 121) as u32);
    assert!(matches!(check(&store, &ahead), Err(ValidationError::TimestampInFuture { .. })));
}

#[test]
fn declared_difficulty_must_match_and_be_met() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let block = build(&store, BlockHash::ZERO, &alice, vec![], NOW as u32);

    let err = validate_block(&block, &store, &params(), Difficulty::from_tenths(10), Timestamp::new(NOW));
    assert!(matches!(err, Err(ValidationError::WrongDifficulty { .. })));

    // a hash meeting 8.0 by chance is a 1 in 4 billion event
    let mut hard = block.clone();
    hard.content.difficulty = Difficulty::from_tenths(80);
    let err = validate_block(&hard, &store, &params(), Difficulty::from_tenths(80), Timestamp::new(NOW));
    assert!(matches!(err, Err(ValidationError::InsufficientWork(_))));
}

#[test]
fn merkle_root_must_commit_to_transactions() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let mut block = build(&store, BlockHash::ZERO, &alice, vec![], NOW as u32);
    block.content.merkle_root = [1; 32];
    assert!(matches!(check(&store, &block), Err(ValidationError::MerkleMismatch)));
}

#[test]
fn coinbase_must_lead_and_pay_exact_reward() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let block = build(&store, BlockHash::ZERO, &alice, vec![], NOW as u32);

    let missing = Block {
        content: block.content.clone(),
        transactions: vec![],
    };
    assert!(matches!(check(&store, &missing), Err(ValidationError::MissingCoinbase)));

    let greedy = Block {
        content: block.content.clone(),
        transactions: vec![LedgerTransaction::Coinbase(CoinbaseTransaction::new(
            block.content.hash(),
            alice.public,
            Amount::from_coins(101),
        ))],
    };
    assert!(matches!(check(&store, &greedy), Err(ValidationError::CoinbaseAmount { .. })));

    let bob = keypair_from_seed(&[2; 32]);
    let stolen = Block {
        content: block.content.clone(),
        transactions: vec![LedgerTransaction::Coinbase(CoinbaseTransaction::new(
            block.content.hash(),
            bob.public,
            Amount::from_coins(100),
        ))],
    };
    assert!(matches!(check(&store, &stolen), Err(ValidationError::CoinbaseRecipient)));
}

#[test]
fn committed_transaction_cannot_be_included_again() {
    let store = NullStore::new();
    let alice = keypair_from_seed(&[1; 32]);
    let bob = keypair_from_seed(&[2; 32]);
    let first = genesis(&store, &alice);

    let tx = pay(&alice, &[coinbase_outpoint(&first)], &[(&bob, 100)]);
    let second = build(&store, first.content.hash(), &alice, vec![tx.clone()], (NOW - 900) as u32);
    accept(&store, &second);

    let content = content(second.content.hash(), &alice, &[tx.clone()], (NOW - 800) as u32);
    let coinbase = CoinbaseTransaction::new(content.hash(), alice.public, block_reward(3, &params()));
    let replay = Block {
        content,
        transactions: vec![LedgerTransaction::Coinbase(coinbase), LedgerTransaction::Regular(tx)],
    };
    assert!(matches!(check(&store, &replay), Err(ValidationError::AlreadyCommitted(_))));
}

#[test]
fn transaction_with_too_many_inputs_cannot_be_built() {
    let alice = keypair_from_seed(&[1; 32]);
    let inputs: Vec<TransactionInput> = (0..256u16)
        .map(|i| {
            let op = OutPoint::new(TxHash::new([(i % 256) as u8; 32]), (i / 256) as u8);
            TransactionInput::unsigned(op, alice.public)
        })
        .collect();
    let out = TransactionOutput::new(alice.public, Amount::new(1));
    assert!(Transaction::new(inputs, vec![out], None).is_err());
}
