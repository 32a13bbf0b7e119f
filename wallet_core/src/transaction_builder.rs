//! Builds and signs payments from a coin selection.

use std::collections::HashMap;

use denaro_crypto::derive_address;
use denaro_transactions::{Transaction, TransactionInput, TransactionOutput};
use denaro_types::{Address, Amount, KeyPair, PublicKey};

use crate::coin_selector::Selection;
use crate::error::WalletError;

pub struct Payment<'a> {
    pub to: &'a Address,
    pub amount: Amount,
    /// Receives `selection.change`, when there is any.
    pub change_to: &'a Address,
    pub message: Option<Vec<u8>>,
}

/// Build a signed transaction spending `selection`. Every selected output
/// must belong to one of `keys`.
pub fn build_payment(
    keys: &[KeyPair],
    selection: &Selection,
    payment: Payment<'_>,
    max_message_len: usize,
) -> Result<Transaction, WalletError> {
    if let Some(message) = &payment.message {
        if message.len() > max_message_len {
            return Err(WalletError::MessageTooLong {
                len: message.len(),
                max: max_message_len,
            });
        }
    }
    if selection.total.checked_sub(payment.amount) != Some(selection.change) {
        return Err(WalletError::InvalidAmount(format!(
            "selection of {} does not fund {} with change {}",
            selection.total, payment.amount, selection.change
        )));
    }

    let owners: HashMap<Address, PublicKey> = keys.iter().map(|k| (derive_address(&k.public), k.public)).collect();
    let inputs = selection
        .inputs
        .iter()
        .map(|utxo| {
            owners
                .get(&utxo.address)
                .map(|public| TransactionInput::unsigned(utxo.outpoint(), *public))
                .ok_or_else(|| WalletError::Key(format!("no key for {}", utxo.address)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut outputs = vec![TransactionOutput::to_address(payment.to, payment.amount)?];
    if !selection.change.is_zero() {
        outputs.push(TransactionOutput::to_address(payment.change_to, selection.change)?);
    }

    let mut tx = Transaction::new(inputs, outputs, payment.message)?;
    tx.sign(keys)?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin_selector::select_inputs;
    use denaro_crypto::keypair_from_seed;
    use denaro_store::UnspentOutput;
    use denaro_types::TxHash;

    fn owned(keys: &KeyPair, n: u8, coins: u64) -> UnspentOutput {
        UnspentOutput {
            tx_hash: TxHash::new([n; 32]),
            index: 0,
            address: derive_address(&keys.public),
            amount: Amount::from_coins(coins),
        }
    }

    #[test]
    fn payment_with_change_is_signed() {
        let alice = keypair_from_seed(&[1; 32]);
        let bob = derive_address(&keypair_from_seed(&[2; 32]).public);
        let me = derive_address(&alice.public);
        let selection = select_inputs(&[owned(&alice, 1, 3), owned(&alice, 2, 5)], Amount::from_coins(4)).unwrap();

        let keys = [alice];
        let tx = build_payment(
            &keys,
            &selection,
            Payment {
                to: &bob,
                amount: Amount::from_coins(4),
                change_to: &me,
                message: Some(b"rent".to_vec()),
            },
            256,
        )
        .unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[1].address(), me);
        assert_eq!(tx.outputs[1].amount, Amount::from_coins(1));
        assert!(tx.verify_signatures());
    }

    #[test]
    fn exact_payment_has_no_change_output() {
        let alice = keypair_from_seed(&[1; 32]);
        let me = derive_address(&alice.public);
        let selection = select_inputs(&[owned(&alice, 1, 5)], Amount::from_coins(5)).unwrap();
        let keys = [alice];
        let tx = build_payment(
            &keys,
            &selection,
            Payment {
                to: &me,
                amount: Amount::from_coins(5),
                change_to: &me,
                message: None,
            },
            256,
        )
        .unwrap();
        assert_eq!(tx.outputs.len(), 1);
    }

    #[test]
    fn foreign_output_is_refused() {
        let alice = keypair_from_seed(&[1; 32]);
        let mallory = keypair_from_seed(&[9; 32]);
        let me = derive_address(&alice.public);
        let selection = select_inputs(&[owned(&mallory, 1, 5)], Amount::from_coins(1)).unwrap();
        let keys = [alice];
        let err = build_payment(
            &keys,
            &selection,
            Payment {
                to: &me,
                amount: Amount::from_coins(1),
                change_to: &me,
                message: None,
            },
            256,
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::Key(_)));
    }

    #[test]
    fn long_message_is_refused() {
        let alice = keypair_from_seed(&[1; 32]);
        let me = derive_address(&alice.public);
        let selection = select_inputs(&[owned(&alice, 1, 5)], Amount::from_coins(1)).unwrap();
        let keys = [alice];
        let err = build_payment(
            &keys,
            &selection,
            Payment {
                to: &me,
                amount: Amount::from_coins(1),
                change_to: &me,
                message: Some(vec![0; 300]),
            },
            256,
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::MessageTooLong { len: 300, max: 256 }));
    }
}
