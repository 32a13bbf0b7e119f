//! Input selection for outgoing payments.
//!
//! Outputs are considered smallest first. A single output that covers the
//! target wins outright (smallest such). Otherwise outputs accumulate in a
//! window of at most [`MAX_INPUTS`]; when the window is full the smallest
//! member is evicted to make room for the next, larger one.

use std::collections::VecDeque;

use denaro_store::UnspentOutput;
use denaro_types::Amount;
use thiserror::Error;

/// A transaction carries at most 255 inputs.
pub const MAX_INPUTS: usize = u8::MAX as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("payment amount must be positive")]
    ZeroTarget,

    #[error("no spendable outputs")]
    NoSpendableOutputs,

    #[error("insufficient funds: short by {shortfall}")]
    InsufficientFunds { shortfall: Amount },

    /// Enough funds exist, but not within 255 inputs. Consolidate first.
    #[error("insufficient funds within {MAX_INPUTS} inputs: short by {shortfall}, consolidate outputs first")]
    NeedsConsolidation { shortfall: Amount },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub inputs: Vec<UnspentOutput>,
    pub total: Amount,
    /// `total - target`, paid back to the change address.
    pub change: Amount,
}

pub fn select_inputs(available: &[UnspentOutput], target: Amount) -> Result<Selection, SelectionError> {
    if target.is_zero() {
        return Err(SelectionError::ZeroTarget);
    }
    if available.is_empty() {
        return Err(SelectionError::NoSpendableOutputs);
    }

    let mut sorted: Vec<&UnspentOutput> = available.iter().collect();
    sorted.sort_by_key(|u| (u.amount, u.tx_hash, u.index));

    if let Some(single) = sorted.iter().find(|u| u.amount >= target) {
        return Ok(Selection {
            inputs: vec![(*single).clone()],
            total: single.amount,
            change: single.amount - target,
        });
    }

    // Every output is below the target from here on.
    let mut window: VecDeque<&UnspentOutput> = VecDeque::with_capacity(MAX_INPUTS);
    let mut sum = Amount::ZERO;
    let mut capped = false;
    for utxo in sorted {
        if window.len() == MAX_INPUTS {
            capped = true;
            if let Some(evicted) = window.pop_front() {
                sum = sum - evicted.amount;
            }
        }
        window.push_back(utxo);
        sum = sum.saturating_add(utxo.amount);
        if sum >= target {
            return Ok(Selection {
                inputs: window.into_iter().cloned().collect(),
                total: sum,
                change: sum - target,
            });
        }
    }

    let shortfall = target - sum;
    if capped {
        Err(SelectionError::NeedsConsolidation { shortfall })
    } else {
        Err(SelectionError::InsufficientFunds { shortfall })
    }
}
