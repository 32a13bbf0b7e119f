//! Property tests for the coin selector.

use denaro_store::UnspentOutput;
use denaro_types::{Address, Amount, TxHash};
use denaro_wallet_core::coin_selector::{select_inputs, SelectionError, MAX_INPUTS};
use proptest::prelude::*;

fn outputs(amounts: &[u64]) -> Vec<UnspentOutput> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, raw)| UnspentOutput {
            tx_hash: TxHash::new([(i / 256) as u8; 32]),
            index: (i % 256) as u8,
            address: Address::new_unchecked("dnr_prop".into()),
            amount: Amount::new(*raw),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A selection never exceeds the input cap and always covers the target.
    #[test]
    fn selection_respects_cap_and_covers_target(
        amounts in prop::collection::vec(1u64..1_000, 1..600),
        target in 1u64..200_000,
    ) {
        let available = outputs(&amounts);
        match select_inputs(&available, Amount::new(target)) {
            Ok(selection) => {
                prop_assert!(selection.inputs.len() <= MAX_INPUTS);
                let sum: u64 = selection.inputs.iter().map(|u| u.amount.raw()).sum();
                prop_assert_eq!(sum, selection.total.raw());
                prop_assert!(sum >= target);
                prop_assert_eq!(selection.change.raw(), sum - target);
            }
            Err(SelectionError::InsufficientFunds { shortfall }) => {
                let total: u64 = amounts.iter().sum();
                prop_assert!(amounts.len() <= MAX_INPUTS);
                prop_assert_eq!(shortfall.raw(), target - total);
            }
            Err(SelectionError::NeedsConsolidation { .. }) => {
                prop_assert!(amounts.len() > MAX_INPUTS);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}
