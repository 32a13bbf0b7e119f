//! Consensus parameters.
//!
//! Every node on a network must run with identical values; changing any of them
//! forks the chain.

use crate::amount::Amount;
use crate::difficulty::Difficulty;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Target seconds between blocks.
    pub block_time_secs: u64,

    /// Blocks between difficulty retargets.
    pub retarget_interval: u64,

    /// Largest factor the expected work may move by in one retarget.
    pub max_retarget_factor: u64,

    pub start_difficulty: Difficulty,

    pub min_difficulty: Difficulty,

    pub max_inputs: usize,

    pub max_outputs: usize,

    /// Bytes allowed in a transaction message.
    pub max_message_len: usize,

    /// Serialized bytes of all transactions in one block.
    pub max_block_size: usize,

    /// How far ahead of local time a block timestamp may be.
    pub max_future_drift_secs: u64,

    pub initial_reward: Amount,

    pub halving_interval: u64,

    /// After this many halvings the base reward is zero.
    pub max_halvings: u64,

    /// Pending transactions offered to miners per candidate block.
    pub mining_candidates: usize,
}

impl ConsensusParams {
    pub fn main() -> Self {
        Self {
            block_time_secs: 180,
            retarget_interval: 500,
            max_retarget_factor: 4,
            start_difficulty: Difficulty::from_tenths(60),
            min_difficulty: Difficulty::from_tenths(10),
            max_inputs: 255,
            max_outputs: 255,
            max_message_len: 256,
            max_block_size: 2 * 1024 * 1024,
            max_future_drift_secs: 120,
            initial_reward: Amount::from_coins(100),
            halving_interval: 262_800,
            max_halvings: 64,
            mining_candidates: 10,
        }
    }

    /// Trivial proof of work, short retarget window.
    pub fn regtest() -> Self {
        Self {
            retarget_interval: 10,
            start_difficulty: Difficulty::ZERO,
            min_difficulty: Difficulty::ZERO,
            ..Self::main()
        }
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::main()
    }
}
