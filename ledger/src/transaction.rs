//! Transaction validation.

use std::collections::HashSet;

use denaro_crypto::derive_address;
use denaro_store::UnspentOutput;
use denaro_transactions::Transaction;
use denaro_types::{Amount, ConsensusParams, OutPoint, TxHash};

use crate::error::ValidationError;
use crate::view::{PendingView, UtxoView};

/// What a successful validation learned about the transaction.
#[derive(Clone, Debug)]
pub struct TxCheck {
    pub hash: TxHash,
    pub fee: Amount,
    /// The outputs the inputs resolve to, in input order.
    pub inputs: Vec<UnspentOutput>,
}

/// Stateless checks: counts, amounts, message size, duplicate inputs.
pub fn check_structure(tx: &Transaction, params: &ConsensusParams) -> Result<(), ValidationError> {
    if tx.inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(ValidationError::NoOutputs);
    }
    if tx.inputs.len() > params.max_inputs {
        return Err(ValidationError::TooManyInputs {
            count: tx.inputs.len(),
            max: params.max_inputs,
        });
    }
    if tx.outputs.len() > params.max_outputs {
        return Err(ValidationError::TooManyOutputs {
            count: tx.outputs.len(),
            max: params.max_outputs,
        });
    }
    if let Some(index) = tx.outputs.iter().position(|o| o.amount.is_zero()) {
        return Err(ValidationError::ZeroOutput(index));
    }
    if tx.message_len() > params.max_message_len {
        return Err(ValidationError::MessageTooLong {
            len: tx.message_len(),
            max: params.max_message_len,
        });
    }
    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(input.outpoint) {
            return Err(ValidationError::DuplicateInput(input.outpoint));
        }
    }
    Ok(())
}

/// Validate `tx` against the unspent set and the pending reservations.
///
/// Checks that every input resolves to an unspent output owned by the input's
/// key and not reserved by a *different* pending transaction, that each
/// distinct key signed the transaction, and that outputs do not exceed inputs.
/// Returns the fee.
///
/// `check_signatures = false` lets block validation verify signatures for
/// all transactions in parallel up front.
pub fn validate_transaction<U, P>(
    tx: &Transaction,
    utxos: &U,
    pending: &P,
    params: &ConsensusParams,
    check_signatures: bool,
) -> Result<TxCheck, ValidationError>
where
    U: UtxoView + ?Sized,
    P: PendingView + ?Sized,
{
    check_structure(tx, params)?;
    let hash = tx.hash();

    let mut inputs = Vec::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        let outpoint: OutPoint = input.outpoint;
        let utxo = utxos
            .unspent_output(&outpoint)?
            .ok_or(ValidationError::InputNotFound(outpoint))?;
        if let Some(spender) = pending.spender_of(&outpoint) {
            if spender != hash {
                return Err(ValidationError::PendingConflict { outpoint, spender });
            }
        }
        if derive_address(&input.public_key) != utxo.address {
            return Err(ValidationError::WrongOwner(outpoint));
        }
        inputs.push(utxo);
    }

    if check_signatures && !tx.verify_signatures() {
        return Err(ValidationError::InvalidSignature(hash));
    }

    let input_total =
        Amount::checked_sum(inputs.iter().map(|u| u.amount)).ok_or(ValidationError::Overflow)?;
    let output_total = tx.output_total().ok_or(ValidationError::Overflow)?;
    let fee = input_total
        .checked_sub(output_total)
        .ok_or_else(|| ValidationError::NegativeFee {
            inputs: input_total.to_string(),
            outputs: output_total.to_string(),
        })?;

    Ok(TxCheck { hash, fee, inputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::NoPending;
    use denaro_crypto::keypair_from_seed;
    use denaro_nullables::NullStore;
    use denaro_transactions::{TransactionInput, TransactionOutput};
    use denaro_types::{KeyPair, PublicKey};

    struct Reserved(OutPoint, TxHash);

    impl PendingView for Reserved {
        fn spender_of(&self, outpoint: &OutPoint) -> Option<TxHash> {
            (*outpoint == self.0).then_some(self.1)
        }
    }

    fn funded(store: &NullStore, owner: &KeyPair, seed: u8, coins: u64) -> OutPoint {
        let utxo = UnspentOutput {
            tx_hash: TxHash::new([seed; 32]),
            index: 0,
            address: derive_address(&owner.public),
            amount: Amount::from_coins(coins),
        };
        let op = utxo.outpoint();
        store.insert_unspent(utxo);
        op
    }

    fn spend(owner: &KeyPair, inputs: &[OutPoint], to: PublicKey, amount: Amount) -> Transaction {
        let mut tx = Transaction::new(
            inputs.iter().map(|op| TransactionInput::unsigned(*op, owner.public)).collect(),
            vec![TransactionOutput::new(to, amount)],
            None,
        )
        .unwrap();
        tx.sign(std::slice::from_ref(owner)).unwrap();
        tx
    }

    #[test]
    fn valid_spend_reports_fee() {
        let store = NullStore::new();
        let alice = keypair_from_seed(&[1; 32]);
        let op = funded(&store, &alice, 1, 5);
        let tx = spend(&alice, &[op], PublicKey([9; 32]), Amount::new(4_900_000));
        let check = validate_transaction(&tx, &store, &NoPending, &ConsensusParams::main(), true).unwrap();
        assert_eq!(check.fee, Amount::new(100_000));
        assert_eq!(check.hash, tx.hash());
    }

    #[test]
    fn unknown_input_rejected() {
        let store = NullStore::new();
        let alice = keypair_from_seed(&[1; 32]);
        let op = OutPoint::new(TxHash::new([7; 32]), 0);
        let tx = spend(&alice, &[op], alice.public, Amount::new(1));
        assert!(matches!(
            validate_transaction(&tx, &store, &NoPending, &ConsensusParams::main(), true),
            Err(ValidationError::InputNotFound(_))
        ));
    }

    #[test]
    fn outputs_above_inputs_rejected() {
        let store = NullStore::new();
        let alice = keypair_from_seed(&[1; 32]);
        let op = funded(&store, &alice, 1, 5);
        let tx = spend(&alice, &[op], alice.public, Amount::from_coins(6));
        assert!(matches!(
            validate_transaction(&tx, &store, &NoPending, &ConsensusParams::main(), true),
            Err(ValidationError::NegativeFee { .. })
        ));
    }

    #[test]
    fn foreign_key_cannot_spend() {
        let store = NullStore::new();
        let alice = keypair_from_seed(&[1; 32]);
        let mallory = keypair_from_seed(&[2; 32]);
        let op = funded(&store, &alice, 1, 5);
        let tx = spend(&mallory, &[op], mallory.public, Amount::from_coins(1));
        assert!(matches!(
            validate_transaction(&tx, &store, &NoPending, &ConsensusParams::main(), true),
            Err(ValidationError::WrongOwner(_))
        ));
    }

    #[test]
    fn forged_signature_rejected() {
        let store = NullStore::new();
        let alice = keypair_from_seed(&[1; 32]);
        let op = funded(&store, &alice, 1, 5);
        let mut tx = spend(&alice, &[op], alice.public, Amount::from_coins(1));
        tx.inputs[0].signature.0[0] ^= 1;
        let params = ConsensusParams::main();
        assert!(matches!(
            validate_transaction(&tx, &store, &NoPending, &params, true),
            Err(ValidationError::InvalidSignature(_))
        ));
        assert!(validate_transaction(&tx, &store, &NoPending, &params, false).is_ok());
    }

    #[test]
    fn pending_reservation_by_other_tx_conflicts() {
        let store = NullStore::new();
        let alice = keypair_from_seed(&[1; 32]);
        let op = funded(&store, &alice, 1, 5);
        let tx = spend(&alice, &[op], alice.public, Amount::from_coins(1));
        let params = ConsensusParams::main();

        let other = Reserved(op, TxHash::new([0xEE; 32]));
        assert!(matches!(
            validate_transaction(&tx, &store, &other, &params, true),
            Err(ValidationError::PendingConflict { .. })
        ));
        let itself = Reserved(op, tx.hash());
        assert!(validate_transaction(&tx, &store, &itself, &params, true).is_ok());
    }

    #[test]
    fn structure_limits() {
        let params = ConsensusParams::main();
        let k = keypair_from_seed(&[1; 32]);
        let ops: Vec<OutPoint> = (0..=255u16)
            .map(|i| OutPoint::new(TxHash::new([(i % 256) as u8; 32]), (i / 256) as u8))
            .collect();
        let too_many = spend(&k, &ops[..255], k.public, Amount::new(1));
        assert!(check_structure(&too_many, &params).is_ok());
        let mut capped = params.clone();
        capped.max_inputs = 254;
        assert!(matches!(
            check_structure(&too_many, &capped),
            Err(ValidationError::TooManyInputs { count: 255, max: 254 })
        ));

        let dup = spend(&k, &[ops[0], ops[0]], k.public, Amount::new(1));
        assert!(matches!(check_structure(&dup, &params), Err(ValidationError::DuplicateInput(_))));

        let zero = spend(&k, &[ops[1]], k.public, Amount::ZERO);
        assert!(matches!(check_structure(&zero, &params), Err(ValidationError::ZeroOutput(0))));
    }
}
