//! Nonce search (multi-threaded CPU).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;

use crate::validator::meets_difficulty;
use crate::WorkError;
use denaro_transactions::BlockContent;

/// Grinds the nonce of a block header on all available cores.
pub struct WorkGenerator;

/// Nonces each thread tries before checking whether another thread won.
const BATCH_SIZE: u64 = 4096;

impl WorkGenerator {
    /// Return `content` with a nonce meeting its declared difficulty.
    ///
    /// The 32-bit nonce space is split by stride across rayon threads. The
    /// first hit stops the others; among concurrent hits the lowest nonce wins.
    pub fn mine(&self, content: &BlockContent) -> Result<BlockContent, WorkError> {
        let target = content.difficulty;
        if meets_difficulty(&content.hash(), target) {
            return Ok(content.clone());
        }

        let found = AtomicU64::new(u64::MAX);
        let done = AtomicBool::new(false);
        let threads = rayon::current_num_threads().max(1) as u64;

        (0..threads).into_par_iter().for_each(|thread_id| {
            let mut candidate = content.clone();
            let mut nonce = thread_id;
            while nonce <= u64::from(u32::MAX) {
                if done.load(Ordering::Relaxed) {
                    return;
                }
                let end = nonce.saturating_add(BATCH_SIZE * threads);
                while nonce < end && nonce <= u64::from(u32::MAX) {
                    candidate.nonce = nonce as u32;
                    if meets_difficulty(&candidate.hash(), target) {
                        found.fetch_min(nonce, Ordering::Relaxed);
                        done.store(true, Ordering::Relaxed);
                        return;
                    }
                    nonce += threads;
                }
            }
        });

        match found.load(Ordering::Relaxed) {
            u64::MAX => Err(WorkError::Exhausted {
                difficulty: target.to_string(),
            }),
            nonce => Ok(BlockContent {
                nonce: nonce as u32,
                ..content.clone()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denaro_types::{BlockHash, Difficulty, PublicKey};

    fn content(difficulty: Difficulty) -> BlockContent {
        BlockContent {
            previous_hash: BlockHash::new([0x42; 32]),
            miner: PublicKey([1; 32]),
            merkle_root: [0; 32],
            timestamp: 1_700_000_000,
            difficulty,
            nonce: 0,
        }
    }

    #[test]
    fn mined_header_verifies() {
        let d = Difficulty::from_tenths(25);
        let mined = WorkGenerator.mine(&content(d)).unwrap();
        assert!(crate::verify_pow(&mined, d));
    }

    #[test]
    fn zero_difficulty_keeps_nonce() {
        let mined = WorkGenerator.mine(&content(Difficulty::ZERO)).unwrap();
        assert_eq!(mined.nonce, 0);
    }
}
