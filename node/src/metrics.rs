//! Prometheus metrics for the denaro node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub transactions_accepted: IntCounter,
    pub transactions_rejected: IntCounter,
    pub blocks_accepted: IntCounter,
    pub blocks_rejected: IntCounter,
    /// Per-peer failures during propagation fan-out.
    pub propagation_failures: IntCounter,
    pub sync_runs: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub chain_height: IntGauge,
    pub mempool_size: IntGauge,
    pub peer_count: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let transactions_accepted = register_int_counter_with_registry!(
            Opts::new("denaro_transactions_accepted_total", "Transactions admitted to the mempool"),
            registry
        )?;
        let transactions_rejected = register_int_counter_with_registry!(
            Opts::new("denaro_transactions_rejected_total", "Transactions refused by the mempool"),
            registry
        )?;
        let blocks_accepted = register_int_counter_with_registry!(
            Opts::new("denaro_blocks_accepted_total", "Blocks committed to the ledger"),
            registry
        )?;
        let blocks_rejected = register_int_counter_with_registry!(
            Opts::new("denaro_blocks_rejected_total", "Blocks rejected by the pipeline"),
            registry
        )?;
        let propagation_failures = register_int_counter_with_registry!(
            Opts::new("denaro_propagation_failures_total", "Failed per-peer propagation requests"),
            registry
        )?;
        let sync_runs = register_int_counter_with_registry!(
            Opts::new("denaro_sync_runs_total", "Chain synchronization runs started"),
            registry
        )?;

        let chain_height = register_int_gauge_with_registry!(
            Opts::new("denaro_chain_height", "Height of the committed tip"),
            registry
        )?;
        let mempool_size = register_int_gauge_with_registry!(
            Opts::new("denaro_mempool_size", "Pending transactions"),
            registry
        )?;
        let peer_count = register_int_gauge_with_registry!(
            Opts::new("denaro_peer_count", "Known peers"),
            registry
        )?;

        Ok(Self {
            registry,
            transactions_accepted,
            transactions_rejected,
            blocks_accepted,
            blocks_rejected,
            propagation_failures,
            sync_runs,
            chain_height,
            mempool_size,
            peer_count,
        })
    }

    /// The registry in Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.blocks_accepted.inc();
        metrics.chain_height.set(42);
        let text = metrics.encode().unwrap();
        assert!(text.contains("denaro_blocks_accepted_total 1"));
        assert!(text.contains("denaro_chain_height 42"));
    }
}
