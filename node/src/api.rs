//! Request and response shapes of the node operations.
//!
//! Amounts are rendered as decimal strings (`"12.500000"`) and hashes as
//! lowercase hex, which is what wallets and peers expect on the wire.

use serde::{Deserialize, Serialize};

use denaro_mempool::PendingTransaction;
use denaro_store::{BlockRecord, TransactionRecord, UnspentOutput};
use denaro_transactions::{LedgerTransaction, Transaction};
use denaro_types::TxHash;

/// Body of `push_block`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushBlockRequest {
    pub block_content: String,
    /// Hex transactions, or 64-char hashes of transactions we should
    /// already have pending.
    #[serde(default)]
    pub txs: Vec<String>,
    #[serde(default, alias = "id")]
    pub block_no: Option<u64>,
}

/// One entry of a `push_block` transaction list.
#[derive(Clone, Debug)]
pub enum TxRef {
    Known(TxHash),
    Inline(Transaction),
}

impl TxRef {
    pub fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        if entry.len() == 64 {
            return TxHash::from_hex(entry)
                .map(Self::Known)
                .map_err(|e| format!("bad transaction hash: {e}"));
        }
        match LedgerTransaction::from_hex(entry) {
            Ok(LedgerTransaction::Regular(tx)) => Ok(Self::Inline(tx)),
            Ok(LedgerTransaction::Coinbase(_)) => Err("coinbase transactions are derived, not relayed".into()),
            Err(e) => Err(format!("bad transaction: {e}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    Accepted(TxHash),
    /// Already pending or committed; pushing it again is harmless.
    AlreadyPresent(TxHash),
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushBlockOutcome {
    Accepted { hash: String, height: u64 },
    AlreadyKnown { hash: String },
    /// The block could not be placed; a sync was started (or was running)
    /// and may end up applying it.
    SyncTriggered { reason: String },
    Rejected { reason: String },
}

impl PushBlockOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStart {
    Started,
    AlreadySyncing,
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeInfo {
    pub version: String,
    pub network: String,
    pub height: u64,
    /// Digest of the unspent set, comparable across nodes at the same height.
    pub unspent_outputs_hash: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockView {
    pub id: u64,
    pub hash: String,
    pub content: String,
    pub address: String,
    pub random: u32,
    pub difficulty: f64,
    pub reward: String,
    pub timestamp: u64,
}

impl From<&BlockRecord> for BlockView {
    fn from(record: &BlockRecord) -> Self {
        Self {
            id: record.height,
            hash: record.hash.to_hex(),
            content: hex::encode(&record.content),
            address: record.miner.to_string(),
            random: record.nonce,
            difficulty: record.difficulty.as_f64(),
            reward: record.reward.to_string(),
            timestamp: record.timestamp.as_secs(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputView {
    pub tx_hash: String,
    pub index: u8,
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputView {
    pub address: String,
    pub amount: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TxView {
    pub hash: String,
    /// `None` while pending.
    pub block_hash: Option<String>,
    pub is_coinbase: bool,
    pub inputs: Vec<InputView>,
    pub outputs: Vec<OutputView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures_valid: Option<bool>,
    pub hex: String,
}

impl TxView {
    fn build(tx: &LedgerTransaction, block_hash: Option<String>, fees: Option<String>, verify: bool) -> Self {
        let (inputs, message, signatures_valid) = match tx {
            LedgerTransaction::Regular(tx) => (
                tx.inputs
                    .iter()
                    .map(|i| InputView {
                        tx_hash: i.outpoint.tx_hash.to_hex(),
                        index: i.outpoint.index,
                        address: i.address().to_string(),
                    })
                    .collect(),
                tx.message.as_ref().map(hex::encode),
                verify.then(|| tx.verify_signatures()),
            ),
            LedgerTransaction::Coinbase(_) => (Vec::new(), None, verify.then_some(true)),
        };
        Self {
            hash: tx.hash().to_hex(),
            block_hash,
            is_coinbase: tx.is_coinbase(),
            inputs,
            outputs: tx
                .outputs()
                .into_iter()
                .map(|(address, amount)| OutputView {
                    address: address.to_string(),
                    amount: amount.to_string(),
                })
                .collect(),
            message,
            fees,
            signatures_valid,
            hex: tx.to_hex(),
        }
    }

    /// View of a committed transaction. `None` if the stored bytes no longer
    /// decode.
    pub fn committed(record: &TransactionRecord, verify: bool) -> Option<Self> {
        let tx = LedgerTransaction::from_bytes(&record.bytes).ok()?;
        Some(Self::build(
            &tx,
            Some(record.block_hash.to_hex()),
            Some(record.fees.to_string()),
            verify,
        ))
    }

    pub fn pending(pending: &PendingTransaction, verify: bool) -> Self {
        let tx = LedgerTransaction::Regular(pending.tx.clone());
        Self::build(&tx, None, Some(pending.fee.to_string()), verify)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnspentView {
    pub tx_hash: String,
    pub index: u8,
    pub amount: String,
}

impl From<&UnspentOutput> for UnspentView {
    fn from(utxo: &UnspentOutput) -> Self {
        Self {
            tx_hash: utxo.tx_hash.to_hex(),
            index: utxo.index,
            amount: utxo.amount.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MiningInfo {
    pub difficulty: f64,
    pub last_block: Option<BlockView>,
    /// Candidates for the next block, as hex.
    pub pending_transactions: Vec<String>,
    pub pending_transactions_hashes: Vec<String>,
    /// Merkle root over the candidates.
    pub merkle_root: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AddressInfo {
    pub balance: String,
    pub spendable_outputs: Vec<UnspentView>,
    pub transactions: Vec<TxView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_transactions: Option<Vec<TxView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_spent_outputs: Option<Vec<PendingSpend>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingSpend {
    pub tx_hash: String,
    pub index: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Hex(Vec<String>),
    Full(Vec<TxView>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockDetail {
    pub block: BlockView,
    pub transactions: BlockTransactions,
}

/// One entry of `get_blocks`: enough for a peer to replay the block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockEntry {
    pub block: BlockView,
    /// Non-coinbase transactions in block order, as hex.
    pub transactions: Vec<String>,
}
