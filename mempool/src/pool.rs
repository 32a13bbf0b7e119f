//! The pending pool and its reservation index.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use denaro_ledger::{validate_transaction, PendingView, UtxoView};
use denaro_store::{StoreError, TransactionStore, UnspentOutput, UtxoStore};
use denaro_transactions::Transaction;
use denaro_types::{Address, Amount, ConsensusParams, OutPoint, Timestamp, TxHash};

use crate::MempoolError;

/// Default cap on pending transactions.
pub const DEFAULT_MAX_SIZE: usize = 50_000;

#[derive(Clone, Debug)]
pub struct PendingTransaction {
    pub tx: Transaction,
    pub hash: TxHash,
    /// Canonical hex, also the listing sort key.
    pub hex: String,
    pub fee: Amount,
    /// The outputs this transaction reserves, in input order.
    pub inputs: Vec<UnspentOutput>,
    pub received_at: Timestamp,
}

impl PendingTransaction {
    /// Amount this transaction moves away from `address` (reserved inputs).
    pub fn spent_from(&self, address: &Address) -> Amount {
        self.inputs
            .iter()
            .filter(|u| &u.address == address)
            .fold(Amount::ZERO, |acc, u| acc.saturating_add(u.amount))
    }

    /// Amount this transaction pays to `address`.
    pub fn paid_to(&self, address: &Address) -> Amount {
        self.tx
            .outputs
            .iter()
            .filter(|o| &o.address() == address)
            .fold(Amount::ZERO, |acc, o| acc.saturating_add(o.amount))
    }

    pub fn touches(&self, address: &Address) -> bool {
        self.inputs.iter().any(|u| &u.address == address)
            || self.tx.outputs.iter().any(|o| &o.address() == address)
    }
}

pub struct Mempool {
    transactions: HashMap<TxHash, PendingTransaction>,
    /// Outpoint → pending transaction reserving it.
    reserved: HashMap<OutPoint, TxHash>,
    max_size: usize,
    last_prune: Option<Timestamp>,
}

impl Mempool {
    pub fn new(max_size: usize) -> Self {
        Self {
            transactions: HashMap::new(),
            reserved: HashMap::new(),
            max_size,
            last_prune: None,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.transactions.contains_key(hash)
    }

    pub fn get(&self, hash: &TxHash) -> Option<&PendingTransaction> {
        self.transactions.get(hash)
    }

    /// Validate `tx` against the committed ledger and the current reservations,
    /// then store it and reserve its inputs.
    ///
    /// The caller holds `&mut self` for the whole check-and-insert, so two
    /// transactions spending the same output can never both get in.
    pub fn admit<S>(
        &mut self,
        tx: Transaction,
        store: &S,
        params: &ConsensusParams,
        now: Timestamp,
    ) -> Result<TxHash, MempoolError>
    where
        S: UtxoStore + TransactionStore + ?Sized,
    {
        let hash = tx.hash();
        if self.transactions.contains_key(&hash) || store.transaction_exists(&hash)? {
            return Err(MempoolError::AlreadyPresent(hash));
        }
        if self.transactions.len() >= self.max_size {
            return Err(MempoolError::Full { max: self.max_size });
        }
        for input in &tx.inputs {
            if let Some(spender) = self.reserved.get(&input.outpoint) {
                return Err(MempoolError::DoubleSpend {
                    outpoint: input.outpoint,
                    spender: *spender,
                });
            }
        }

        let check = validate_transaction(&tx, store, &*self, params, true)?;

        for input in &tx.inputs {
            self.reserved.insert(input.outpoint, hash);
        }
        let hex = tx.to_hex();
        debug!(%hash, fee = %check.fee, pending = self.transactions.len() + 1, "admitted to mempool");
        self.transactions.insert(
            hash,
            PendingTransaction {
                tx,
                hash,
                hex,
                fee: check.fee,
                inputs: check.inputs,
                received_at: now,
            },
        );
        Ok(hash)
    }

    fn remove(&mut self, hash: &TxHash) -> Option<PendingTransaction> {
        let removed = self.transactions.remove(hash)?;
        for input in &removed.tx.inputs {
            if self.reserved.get(&input.outpoint) == Some(hash) {
                self.reserved.remove(&input.outpoint);
            }
        }
        Some(removed)
    }

    /// Drop transactions a committed block confirmed, plus any pending
    /// transaction that reserved an output the block spent (it can no longer
    /// be mined). Returns how many were removed.
    pub fn evict_confirmed(&mut self, confirmed: &[TxHash], spent: &[OutPoint]) -> usize {
        let mut removed = 0;
        for hash in confirmed {
            if self.remove(hash).is_some() {
                removed += 1;
            }
        }
        let conflicting: Vec<TxHash> = spent
            .iter()
            .filter_map(|outpoint| self.reserved.get(outpoint).copied())
            .collect();
        for hash in conflicting {
            if self.remove(&hash).is_some() {
                debug!(%hash, "evicted conflicting pending transaction");
                removed += 1;
            }
        }
        removed
    }

    /// Drop transactions older than `max_age_secs` and those whose inputs are
    /// no longer unspent in `utxos`.
    pub fn prune<U: UtxoView + ?Sized>(
        &mut self,
        max_age_secs: u64,
        now: Timestamp,
        utxos: &U,
    ) -> Result<usize, StoreError> {
        let mut stale = Vec::new();
        for (hash, pending) in &self.transactions {
            if pending.received_at.has_expired(max_age_secs, now) {
                stale.push(*hash);
                continue;
            }
            for input in &pending.tx.inputs {
                if utxos.unspent_output(&input.outpoint)?.is_none() {
                    stale.push(*hash);
                    break;
                }
            }
        }
        for hash in &stale {
            self.remove(hash);
        }
        self.last_prune = Some(now);
        if !stale.is_empty() {
            info!(pruned = stale.len(), remaining = self.transactions.len(), "pruned mempool");
        }
        Ok(stale.len())
    }

    /// `prune`, at most once per `interval_secs`. `None` when skipped.
    pub fn maybe_prune<U: UtxoView + ?Sized>(
        &mut self,
        interval_secs: u64,
        max_age_secs: u64,
        now: Timestamp,
        utxos: &U,
    ) -> Result<Option<usize>, StoreError> {
        if let Some(last) = self.last_prune {
            if !last.has_expired(interval_secs, now) {
                return Ok(None);
            }
        }
        self.prune(max_age_secs, now, utxos).map(Some)
    }

    /// Pending transactions ordered by their hex encoding, at most `limit`.
    ///
    /// The ordering only depends on the set's content, so every node with the
    /// same pending set offers miners the same candidates.
    pub fn list(&self, limit: usize) -> Vec<&PendingTransaction> {
        let mut all: Vec<&PendingTransaction> = self.transactions.values().collect();
        all.sort_unstable_by(|a, b| a.hex.cmp(&b.hex));
        all.truncate(limit);
        all
    }

    /// Outpoints reserved by pending transactions, restricted to those owned by
    /// `address` when given.
    pub fn reserved_outpoints(&self, address: Option<&Address>) -> Vec<OutPoint> {
        let mut outpoints: Vec<OutPoint> = match address {
            None => self.reserved.keys().copied().collect(),
            Some(address) => self
                .transactions
                .values()
                .flat_map(|p| p.inputs.iter())
                .filter(|u| &u.address == address)
                .map(UnspentOutput::outpoint)
                .collect(),
        };
        outpoints.sort_unstable();
        outpoints
    }

    pub fn is_reserved(&self, outpoint: &OutPoint) -> bool {
        self.reserved.contains_key(outpoint)
    }

    /// Pending transactions sending from or paying to `address`, in listing order.
    pub fn touching(&self, address: &Address) -> Vec<&PendingTransaction> {
        let by_hex: BTreeMap<&str, &PendingTransaction> = self
            .transactions
            .values()
            .filter(|p| p.touches(address))
            .map(|p| (p.hex.as_str(), p))
            .collect();
        by_hex.into_values().collect()
    }

    /// Committed balance adjusted by pending activity: reserved inputs owned by
    /// `address` are subtracted, pending outputs paying it are added.
    pub fn pending_balance(&self, address: &Address, committed: Amount) -> Amount {
        let (out, incoming) = self
            .transactions
            .values()
            .fold((Amount::ZERO, Amount::ZERO), |(out, incoming), p| {
                (
                    out.saturating_add(p.spent_from(address)),
                    incoming.saturating_add(p.paid_to(address)),
                )
            });
        committed.saturating_sub(out).saturating_add(incoming)
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl PendingView for Mempool {
    fn spender_of(&self, outpoint: &OutPoint) -> Option<TxHash> {
        self.reserved.get(outpoint).copied()
    }
}
