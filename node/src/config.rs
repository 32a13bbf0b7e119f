//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use denaro_types::{ConsensusParams, NetworkId};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a denaro node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Consensus preset.
    #[serde(default)]
    pub network: NetworkId,

    /// Directory holding the LMDB ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Public base URL of this node, sent as `Sender-Node` and never added
    /// as a peer.
    #[serde(default)]
    pub self_url: Option<String>,

    /// Peers registered at start without a liveness probe.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    #[serde(default = "default_max_peers")]
    pub max_peers: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-peer deadline for relayed requests.
    #[serde(default = "default_propagation_timeout")]
    pub propagation_timeout_secs: u64,

    /// Deadline for the liveness probe of `add_node`.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Hashes remembered to suppress re-propagation.
    #[serde(default = "default_recent_capacity")]
    pub recent_cache_capacity: usize,

    #[serde(default = "default_mempool_max_size")]
    pub mempool_max_size: usize,

    /// Pending transactions older than this are pruned.
    #[serde(default = "default_pending_max_age")]
    pub pending_max_age_secs: u64,

    /// Minimum spacing between two mempool pruning scans.
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,

    /// Whether to expose Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./denaro_data")
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    NetworkId::Main.default_port()
}

fn default_max_peers() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_propagation_timeout() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_recent_capacity() -> usize {
    denaro_network::DEFAULT_RECENT_CAPACITY
}

fn default_mempool_max_size() -> usize {
    denaro_mempool::DEFAULT_MAX_SIZE
}

fn default_pending_max_age() -> u64 {
    60 * 60 * 24
}

fn default_prune_interval() -> u64 {
    600
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Consensus constants of the configured network.
    pub fn params(&self) -> ConsensusParams {
        self.network.params()
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_host, self.rpc_port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::default(),
            data_dir: default_data_dir(),
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            self_url: None,
            bootstrap_peers: Vec::new(),
            max_peers: default_max_peers(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            propagation_timeout_secs: default_propagation_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            recent_cache_capacity: default_recent_capacity(),
            mempool_max_size: default_mempool_max_size(),
            pending_max_age_secs: default_pending_max_age(),
            prune_interval_secs: default_prune_interval(),
            enable_metrics: false,
        }
    }
}
