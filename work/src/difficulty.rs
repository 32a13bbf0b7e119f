//! Difficulty retargeting from observed block times.
//!
//! The target holds constant between retarget heights. At heights
//! `k × interval + 1` the elapsed time over the last `interval` blocks is
//! compared with the expected time; the expected work per block is scaled by
//! their ratio, clamped to the configured step factor in either direction.

use std::collections::VecDeque;

use denaro_types::{ConsensusParams, Difficulty};
use tracing::debug;

use crate::validator::next_digit_limit;

/// Expected number of hashes needed to meet `difficulty`.
pub fn expected_work(difficulty: Difficulty) -> f64 {
    16f64.powi(i32::from(difficulty.whole())) * 16.0 / f64::from(next_digit_limit(difficulty))
}

/// The tenth-step difficulty whose work is closest (in log scale) to
/// `work(old) × expected_secs / actual_secs`, never moving work by more than
/// `max_factor` either way and never below `min`.
pub fn retarget(
    old: Difficulty,
    actual_secs: u64,
    expected_secs: u64,
    max_factor: u64,
    min: Difficulty,
) -> Difficulty {
    let factor = max_factor.max(1) as f64;
    let ratio = (expected_secs.max(1) as f64 / actual_secs.max(1) as f64).clamp(1.0 / factor, factor);
    let old_log = expected_work(old).ln();
    let target_log = old_log + ratio.ln();
    let bound = factor.ln() + 1e-9;

    let mut best = old;
    let mut best_dist = (old_log - target_log).abs();
    for tenths in min.tenths()..=Difficulty::MAX.tenths() {
        let candidate = Difficulty::from_tenths(tenths);
        let log = expected_work(candidate).ln();
        if (log - old_log).abs() > bound {
            continue;
        }
        let dist = (log - target_log).abs();
        if dist < best_dist {
            best = candidate;
            best_dist = dist;
        }
    }
    best.max(min)
}

/// One committed block as seen by the adjuster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainSample {
    pub height: u64,
    pub timestamp: u64,
    pub difficulty: Difficulty,
}

/// Sliding window over the most recent `retarget_interval` blocks.
pub struct DifficultyAdjuster {
    window: VecDeque<ChainSample>,
    interval: u64,
    block_time: u64,
    max_factor: u64,
    start: Difficulty,
    min: Difficulty,
}

impl DifficultyAdjuster {
    pub fn new(params: &ConsensusParams) -> Self {
        let interval = params.retarget_interval.max(2);
        Self {
            window: VecDeque::with_capacity(interval as usize),
            interval,
            block_time: params.block_time_secs,
            max_factor: params.max_retarget_factor,
            start: params.start_difficulty,
            min: params.min_difficulty,
        }
    }

    /// How many trailing blocks the adjuster wants to be seeded with.
    pub fn window_len(&self) -> u64 {
        self.interval
    }

    /// Record a newly committed block. Samples must arrive in height order.
    pub fn record_block(&mut self, sample: ChainSample) {
        if let Some(last) = self.window.back() {
            if sample.height != last.height + 1 {
                self.window.clear();
            }
        }
        self.window.push_back(sample);
        while self.window.len() as u64 > self.interval {
            self.window.pop_front();
        }
    }

    pub fn tip(&self) -> Option<&ChainSample> {
        self.window.back()
    }

    /// Difficulty the block after the current tip must declare.
    pub fn next_difficulty(&self) -> Difficulty {
        let Some(tip) = self.window.back() else {
            return self.start;
        };
        if tip.height < self.interval || tip.height % self.interval != 0 {
            return tip.difficulty;
        }
        let Some(first) = self.window.front() else {
            return tip.difficulty;
        };
        if tip.height - first.height + 1 != self.interval {
            // Not enough history loaded to retarget; hold.
            return tip.difficulty;
        }
        let actual = tip.timestamp.saturating_sub(first.timestamp);
        let expected = (self.interval - 1) * self.block_time;
        let next = retarget(tip.difficulty, actual, expected, self.max_factor, self.min);
        debug!(
            height = tip.height + 1,
            actual,
            expected,
            old = %tip.difficulty,
            new = %next,
            "difficulty retarget"
        );
        next
    }
}
