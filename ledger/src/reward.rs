use denaro_types::{Amount, ConsensusParams};

/// Base reward for the block at `height` (genesis is 1): the initial reward
/// halved once per `halving_interval` blocks, zero after `max_halvings`.
pub fn block_reward(height: u64, params: &ConsensusParams) -> Amount {
    let halvings = height.saturating_sub(1) / params.halving_interval.max(1);
    if halvings >= params.max_halvings || halvings >= 64 {
        return Amount::ZERO;
    }
    Amount::new(params.initial_reward.raw() >> halvings)
}
