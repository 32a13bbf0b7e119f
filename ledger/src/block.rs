//! Block validation and commit-set construction.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;

use denaro_crypto::derive_address;
use denaro_store::{BlockCommit, BlockRecord, BlockStore, LedgerStore, TransactionRecord, UnspentOutput};
use denaro_transactions::{merkle_root, BlockContent, CoinbaseTransaction, LedgerTransaction, Transaction};
use denaro_types::{Address, Amount, ConsensusParams, Difficulty, OutPoint, Timestamp, TxHash};
use denaro_work::meets_difficulty;

use crate::error::ValidationError;
use crate::reward::block_reward;
use crate::transaction::validate_transaction;
use crate::view::{NoPending, OverlayUtxoView, UtxoView};

/// A block as validated and stored: header plus transactions, coinbase first.
#[derive(Clone, Debug)]
pub struct Block {
    pub content: BlockContent,
    pub transactions: Vec<LedgerTransaction>,
}

impl Block {
    /// Prepend the coinbase paying `reward(height) + fees` to the miner.
    ///
    /// Peers relay blocks without their coinbase; every node derives it from
    /// the header and the fees of the relayed transactions.
    pub fn with_coinbase<U: UtxoView + ?Sized>(
        content: BlockContent,
        regular: Vec<Transaction>,
        utxos: &U,
        height: u64,
        params: &ConsensusParams,
    ) -> Result<Self, ValidationError> {
        let fees = total_fees(&regular, utxos)?;
        let amount = block_reward(height, params)
            .checked_add(fees)
            .ok_or(ValidationError::Overflow)?;
        let coinbase = CoinbaseTransaction::new(content.hash(), content.miner, amount);
        let mut transactions = Vec::with_capacity(regular.len() + 1);
        transactions.push(LedgerTransaction::Coinbase(coinbase));
        transactions.extend(regular.into_iter().map(LedgerTransaction::Regular));
        Ok(Self {
            content,
            transactions,
        })
    }

    /// Non-coinbase transactions in block order.
    pub fn regular(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter_map(|tx| match tx {
            LedgerTransaction::Regular(tx) => Some(tx),
            LedgerTransaction::Coinbase(_) => None,
        })
    }
}

/// Sum of fees of `txs` applied in order, allowing intra-block spends.
/// Only resolves amounts: ownership and signatures are left to `validate_block`.
pub fn total_fees<U: UtxoView + ?Sized>(txs: &[Transaction], utxos: &U) -> Result<Amount, ValidationError> {
    let mut overlay = OverlayUtxoView::new(utxos);
    let mut fees = Amount::ZERO;
    for tx in txs {
        let mut inputs = Amount::ZERO;
        for input in &tx.inputs {
            let utxo = overlay
                .unspent_output(&input.outpoint)?
                .ok_or(ValidationError::InputNotFound(input.outpoint))?;
            inputs = inputs.checked_add(utxo.amount).ok_or(ValidationError::Overflow)?;
        }
        let outputs = tx.output_total().ok_or(ValidationError::Overflow)?;
        let fee = inputs
            .checked_sub(outputs)
            .ok_or_else(|| ValidationError::NegativeFee {
                inputs: inputs.to_string(),
                outputs: outputs.to_string(),
            })?;
        fees = fees.checked_add(fee).ok_or(ValidationError::Overflow)?;
        let spends: Vec<OutPoint> = tx.inputs.iter().map(|i| i.outpoint).collect();
        overlay.apply(&spends, created_outputs(&tx.hash(), tx));
    }
    Ok(fees)
}

fn created_outputs(hash: &TxHash, tx: &Transaction) -> Vec<UnspentOutput> {
    tx.outputs
        .iter()
        .enumerate()
        .map(|(index, o)| UnspentOutput {
            tx_hash: *hash,
            index: index as u8,
            address: o.address(),
            amount: o.amount,
        })
        .collect()
}

fn input_addresses(tx: &Transaction) -> Vec<Address> {
    let mut seen = HashSet::new();
    tx.inputs
        .iter()
        .filter(|i| seen.insert(i.public_key))
        .map(|i| derive_address(&i.public_key))
        .collect()
}

/// Validate `block` as the next block on top of `store`'s tip and return the
/// changes to commit.
///
/// Checks, in order: previous hash is the tip, timestamp after the tip and not
/// too far ahead of `now`, declared difficulty equals `expected_difficulty` and
/// the hash meets it, a single leading coinbase, merkle root over the other
/// transactions, size limit, no duplicate or already committed transactions,
/// signatures (in parallel), then every transaction in order against the
/// unspent set plus the effects of the transactions before it, and finally the
/// coinbase amount of `reward + fees`.
pub fn validate_block<S: LedgerStore + ?Sized>(
    block: &Block,
    store: &S,
    params: &ConsensusParams,
    expected_difficulty: Difficulty,
    now: Timestamp,
) -> Result<BlockCommit, ValidationError> {
    let content = &block.content;
    let block_hash = content.hash();

    let tip = store.tip()?;
    let (expected_prev, height) = match &tip {
        Some(tip) => (tip.hash, tip.height + 1),
        None => (denaro_types::BlockHash::ZERO, 1),
    };
    if content.previous_hash != expected_prev {
        return Err(ValidationError::PreviousMismatch {
            expected: expected_prev.to_string(),
            actual: content.previous_hash.to_string(),
        });
    }

    let timestamp = u64::from(content.timestamp);
    if let Some(tip) = &tip {
        if timestamp <= tip.timestamp.as_secs() {
            return Err(ValidationError::TimestampNotIncreasing {
                timestamp,
                tip: tip.timestamp.as_secs(),
            });
        }
    }
    if timestamp > now.as_secs().saturating_add(params.max_future_drift_secs) {
        return Err(ValidationError::TimestampInFuture {
            timestamp,
            now: now.as_secs(),
        });
    }

    if content.difficulty != expected_difficulty {
        return Err(ValidationError::WrongDifficulty {
            declared: content.difficulty.to_string(),
            expected: expected_difficulty.to_string(),
        });
    }
    if !meets_difficulty(&block_hash, expected_difficulty) {
        return Err(ValidationError::InsufficientWork(expected_difficulty.to_string()));
    }

    let coinbase = match block.transactions.first() {
        Some(LedgerTransaction::Coinbase(cb)) => cb,
        _ => return Err(ValidationError::MissingCoinbase),
    };
    if let Some(index) = block.transactions.iter().skip(1).position(LedgerTransaction::is_coinbase) {
        return Err(ValidationError::ExtraCoinbase(index + 1));
    }
    let regular: Vec<&Transaction> = block.regular().collect();
    let hashes: Vec<TxHash> = regular.iter().map(|tx| tx.hash()).collect();

    if merkle_root(&hashes) != content.merkle_root {
        return Err(ValidationError::MerkleMismatch);
    }

    let size: usize = regular.iter().map(|tx| tx.to_bytes().len()).sum();
    if size > params.max_block_size {
        return Err(ValidationError::BlockTooLarge {
            size,
            max: params.max_block_size,
        });
    }

    let mut unique = HashSet::with_capacity(hashes.len() + 1);
    let coinbase_hash = coinbase.hash();
    unique.insert(coinbase_hash);
    for hash in &hashes {
        if !unique.insert(*hash) {
            return Err(ValidationError::DuplicateTransaction(*hash));
        }
    }
    for hash in unique.iter() {
        if store.transaction_exists(hash)? {
            return Err(ValidationError::AlreadyCommitted(*hash));
        }
    }

    if let Some(bad) = regular
        .par_iter()
        .zip(hashes.par_iter())
        .find_any(|(tx, _)| !tx.verify_signatures())
    {
        return Err(ValidationError::InvalidSignature(*bad.1));
    }

    let mut overlay = OverlayUtxoView::new(store);
    let mut fees = Amount::ZERO;
    let mut records = Vec::with_capacity(regular.len() + 1);
    for (tx, hash) in regular.iter().zip(&hashes) {
        let check = validate_transaction(*tx, &overlay, &NoPending, params, false)?;
        fees = fees.checked_add(check.fee).ok_or(ValidationError::Overflow)?;
        let spends: Vec<OutPoint> = tx.inputs.iter().map(|i| i.outpoint).collect();
        overlay.apply(&spends, created_outputs(hash, tx));
        records.push(TransactionRecord {
            hash: *hash,
            block_hash,
            bytes: tx.to_bytes(),
            inputs_addresses: input_addresses(tx),
            outputs_addresses: tx.outputs.iter().map(|o| o.address()).collect(),
            fees: check.fee,
            is_coinbase: false,
        });
    }

    let expected_amount = block_reward(height, params)
        .checked_add(fees)
        .ok_or(ValidationError::Overflow)?;
    if coinbase.amount() != expected_amount {
        return Err(ValidationError::CoinbaseAmount {
            expected: expected_amount.to_string(),
            actual: coinbase.amount().to_string(),
        });
    }
    if coinbase.output.recipient != content.miner {
        return Err(ValidationError::CoinbaseRecipient);
    }
    if coinbase.block_hash != block_hash {
        return Err(ValidationError::CoinbaseBlockHash);
    }

    let miner = content.miner_address();
    records.insert(
        0,
        TransactionRecord {
            hash: coinbase_hash,
            block_hash,
            bytes: coinbase.to_bytes(),
            inputs_addresses: Vec::new(),
            outputs_addresses: vec![miner.clone()],
            fees: Amount::ZERO,
            is_coinbase: true,
        },
    );

    let (spent, mut created) = overlay.into_changes();
    created.push(UnspentOutput {
        tx_hash: coinbase_hash,
        index: 0,
        address: miner.clone(),
        amount: coinbase.amount(),
    });

    debug!(height, hash = %block_hash, txs = records.len(), %fees, "block valid");

    Ok(BlockCommit {
        block: BlockRecord {
            hash: block_hash,
            height,
            previous_hash: content.previous_hash,
            content: content.to_bytes().to_vec(),
            miner,
            nonce: content.nonce,
            difficulty: content.difficulty,
            timestamp: Timestamp::new(timestamp),
            reward: coinbase.amount(),
        },
        transactions: records,
        spent,
        created,
    })
}
