//! PoW validation.

use denaro_transactions::BlockContent;
use denaro_types::{BlockHash, Difficulty};

/// Upper bound (exclusive) for the hex digit after the zero prefix.
pub(crate) fn next_digit_limit(difficulty: Difficulty) -> u8 {
    let frac = difficulty.fraction();
    ((16 * (10 - frac) + 9) / 10) as u8
}

fn nibble(hash: &BlockHash, i: usize) -> u8 {
    let byte = hash.as_bytes()[i / 2];
    if i % 2 == 0 {
        byte >> 4
    } else {
        byte & 0x0F
    }
}

/// Whether `hash` satisfies `difficulty`.
pub fn meets_difficulty(hash: &BlockHash, difficulty: Difficulty) -> bool {
    let whole = difficulty.whole() as usize;
    if whole > 64 {
        return false;
    }
    if (0..whole).any(|i| nibble(hash, i) != 0) {
        return false;
    }
    if whole == 64 {
        return difficulty.fraction() == 0;
    }
    nibble(hash, whole) < next_digit_limit(difficulty)
}

/// Recompute the proof hash and check both the declared difficulty and the work.
pub fn verify_pow(content: &BlockContent, target: Difficulty) -> bool {
    content.difficulty == target && meets_difficulty(&content.hash(), target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_with_prefix(prefix: &[u8]) -> BlockHash {
        let mut bytes = [0xFFu8; 32];
        bytes[..prefix.len()].copy_from_slice(prefix);
        BlockHash::new(bytes)
    }

    #[test]
    fn digit_limits() {
        assert_eq!(next_digit_limit(Difficulty::from_tenths(60)), 16);
        assert_eq!(next_digit_limit(Difficulty::from_tenths(65)), 8);
        assert_eq!(next_digit_limit(Difficulty::from_tenths(61)), 15);
        assert_eq!(next_digit_limit(Difficulty::from_tenths(69)), 2);
    }

    #[test]
    fn whole_difficulty_counts_zero_nibbles() {
        let h = hash_with_prefix(&[0x00, 0x0F]);
        assert!(meets_difficulty(&h, Difficulty::from_tenths(30)));
        assert!(!meets_difficulty(&h, Difficulty::from_tenths(40)));
    }

    #[test]
    fn fraction_narrows_next_digit() {
        // three zero nibbles, then 7
        let h = hash_with_prefix(&[0x00, 0x07]);
        assert!(meets_difficulty(&h, Difficulty::from_tenths(35)));
        // 7 is not below ceil(16 * 0.4) = 7
        assert!(!meets_difficulty(&h, Difficulty::from_tenths(36)));
    }

    #[test]
    fn zero_difficulty_accepts_anything() {
        assert!(meets_difficulty(&BlockHash::new([0xFF; 32]), Difficulty::ZERO));
    }
}
