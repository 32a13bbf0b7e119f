use proptest::prelude::*;

use denaro_types::{BlockHash, Difficulty};
use denaro_work::{expected_work, meets_difficulty, retarget};

proptest! {
    /// A retarget never moves expected work by more than the step factor.
    #[test]
    fn retarget_respects_step_bound(
        old in 10u16..=600,
        actual in 1u64..100_000_000,
        factor in 2u64..=8,
    ) {
        let old = Difficulty::from_tenths(old);
        let new = retarget(old, actual, 180 * 499, factor, Difficulty::from_tenths(10));
        let ratio = expected_work(new) / expected_work(old);
        prop_assert!(ratio <= factor as f64 * (1.0 + 1e-6), "ratio {ratio}");
        prop_assert!(ratio >= 1.0 / factor as f64 * (1.0 - 1e-6), "ratio {ratio}");
    }

    /// Faster-than-target blocks never lower the difficulty, slower never raise it.
    #[test]
    fn retarget_direction(old in 10u16..=600, actual in 1u64..100_000_000) {
        let old = Difficulty::from_tenths(old);
        let expected = 180 * 499;
        let new = retarget(old, actual, expected, 4, Difficulty::from_tenths(10));
        if actual < expected {
            prop_assert!(new >= old);
        } else {
            prop_assert!(new <= old);
        }
    }

    /// Meeting a difficulty implies meeting every lower one.
    #[test]
    fn difficulty_is_monotone(bytes in prop::array::uniform32(0u8..), a in 0u16..=640, b in 0u16..=640) {
        let hash = BlockHash::new(bytes);
        let (lo, hi) = (a.min(b), a.max(b));
        if meets_difficulty(&hash, Difficulty::from_tenths(hi)) {
            prop_assert!(meets_difficulty(&hash, Difficulty::from_tenths(lo)));
        }
    }
}
