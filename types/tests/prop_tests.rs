use proptest::prelude::*;

use denaro_types::{Amount, BlockHash, Difficulty, Timestamp, TxHash};

proptest! {
    /// Display output parses back to the same amount.
    #[test]
    fn amount_display_parse_roundtrip(raw in 0u64..u64::MAX) {
        let amount = Amount::new(raw);
        let parsed: Amount = amount.to_string().parse().unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// Amount ordering follows the raw value.
    #[test]
    fn amount_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Amount::new(a) <= Amount::new(b), a <= b);
    }

    /// checked_sub fails exactly when the result would be negative.
    #[test]
    fn amount_checked_sub(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Amount::new(a).checked_sub(Amount::new(b)).is_none(), b > a);
    }

    /// Hex form of a TxHash parses back to the same hash.
    #[test]
    fn tx_hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(hash.to_string().parse::<TxHash>().unwrap(), hash);
    }

    /// BlockHash::is_zero is true only for all-zero bytes.
    #[test]
    fn block_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }

    /// BlockHash bincode serialization roundtrip.
    #[test]
    fn block_hash_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: BlockHash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    /// Every representable difficulty survives Display then FromStr.
    #[test]
    fn difficulty_display_parse(tenths in 0u16..=640) {
        let d = Difficulty::from_tenths(tenths);
        prop_assert_eq!(d.to_string().parse::<Difficulty>().unwrap(), d);
    }

    /// has_expired agrees with plain arithmetic.
    #[test]
    fn timestamp_expiry(start in 0u64..1_000_000, dur in 0u64..1_000_000, now in 0u64..3_000_000) {
        let ts = Timestamp::new(start);
        prop_assert_eq!(ts.has_expired(dur, Timestamp::new(now)), now >= start + dur);
    }
}
