//! Read-only views the validator runs against.

use std::collections::{BTreeMap, HashSet};

use denaro_store::{StoreError, UnspentOutput, UtxoStore};
use denaro_types::{OutPoint, TxHash};

/// Lookup of committed-and-unspent outputs.
pub trait UtxoView {
    fn unspent_output(&self, outpoint: &OutPoint) -> Result<Option<UnspentOutput>, StoreError>;
}

impl<T: UtxoStore + ?Sized> UtxoView for T {
    fn unspent_output(&self, outpoint: &OutPoint) -> Result<Option<UnspentOutput>, StoreError> {
        self.get_unspent_output(outpoint)
    }
}

/// Provisional reservations held by pending transactions.
pub trait PendingView {
    /// The pending transaction currently reserving `outpoint`, if any.
    fn spender_of(&self, outpoint: &OutPoint) -> Option<TxHash>;
}

/// No reservations: block validation ignores the mempool.
pub struct NoPending;

impl PendingView for NoPending {
    fn spender_of(&self, _outpoint: &OutPoint) -> Option<TxHash> {
        None
    }
}

/// The base view plus the effects of transactions applied so far within one
/// block, so a later transaction may spend an output created earlier in it.
pub struct OverlayUtxoView<'a, V: UtxoView + ?Sized> {
    base: &'a V,
    spent: HashSet<OutPoint>,
    created: BTreeMap<OutPoint, UnspentOutput>,
    /// Spent outpoints that came from `base`, in spend order.
    spent_from_base: Vec<OutPoint>,
}

impl<'a, V: UtxoView + ?Sized> OverlayUtxoView<'a, V> {
    pub fn new(base: &'a V) -> Self {
        Self {
            base,
            spent: HashSet::new(),
            created: BTreeMap::new(),
            spent_from_base: Vec::new(),
        }
    }

    /// Consume the inputs and add the outputs of an already validated transaction.
    pub fn apply(&mut self, spends: &[OutPoint], outputs: Vec<UnspentOutput>) {
        for outpoint in spends {
            if self.created.remove(outpoint).is_none() {
                self.spent_from_base.push(*outpoint);
            }
            self.spent.insert(*outpoint);
        }
        for output in outputs {
            self.created.insert(output.outpoint(), output);
        }
    }

    /// `(committed outpoints spent, outputs created and still unspent)`.
    pub fn into_changes(self) -> (Vec<OutPoint>, Vec<UnspentOutput>) {
        (self.spent_from_base, self.created.into_values().collect())
    }
}

impl<V: UtxoView + ?Sized> UtxoView for OverlayUtxoView<'_, V> {
    fn unspent_output(&self, outpoint: &OutPoint) -> Result<Option<UnspentOutput>, StoreError> {
        if let Some(created) = self.created.get(outpoint) {
            return Ok(Some(created.clone()));
        }
        if self.spent.contains(outpoint) {
            return Ok(None);
        }
        self.base.unspent_output(outpoint)
    }
}
