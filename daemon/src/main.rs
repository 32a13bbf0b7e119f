//! denaro daemon: runs a node and its RPC server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use denaro_node::{init_logging, DenaroNode, LogFormat, NodeConfig};
use denaro_rpc::RpcServer;
use denaro_types::NetworkId;

#[derive(Parser)]
#[command(name = "denaro-daemon", about = "denaro proof-of-work node")]
struct Cli {
    /// Consensus preset: "main" or "regtest".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "DENARO_NETWORK")]
    network: Option<String>,

    /// Data directory for the ledger.
    #[arg(long, env = "DENARO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address the RPC server binds to.
    #[arg(long, env = "DENARO_RPC_HOST")]
    rpc_host: Option<String>,

    /// RPC server port.
    #[arg(long, env = "DENARO_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Public URL of this node, announced to peers.
    #[arg(long, env = "DENARO_SELF_URL")]
    self_url: Option<String>,

    /// Bootstrap peer URLs (comma-separated: "http://a:3006,http://b:3006").
    #[arg(long, env = "DENARO_BOOTSTRAP_PEERS", value_delimiter = ',')]
    bootstrap_peers: Vec<String>,

    /// Maximum number of known peers.
    #[arg(long, env = "DENARO_MAX_PEERS")]
    max_peers: Option<usize>,

    /// Enable Prometheus metrics endpoint.
    #[arg(long, env = "DENARO_ENABLE_METRICS")]
    metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DENARO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DENARO_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DENARO_CONFIG")]
    config: Option<PathBuf>,
}

fn parse_network(s: &str) -> anyhow::Result<NetworkId> {
    match s.to_ascii_lowercase().as_str() {
        "main" | "mainnet" => Ok(NetworkId::Main),
        "regtest" | "dev" => Ok(NetworkId::Regtest),
        other => bail!("unknown network {other:?}, expected \"main\" or \"regtest\""),
    }
}

fn build_config(cli: Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path).with_context(|| format!("loading {path}"))?
        }
        None => NodeConfig::default(),
    };

    if let Some(network) = cli.network.as_deref() {
        config.network = parse_network(network)?;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(rpc_host) = cli.rpc_host {
        config.rpc_host = rpc_host;
    }
    if let Some(rpc_port) = cli.rpc_port {
        config.rpc_port = rpc_port;
    }
    if cli.self_url.is_some() {
        config.self_url = cli.self_url;
    }
    if !cli.bootstrap_peers.is_empty() {
        config.bootstrap_peers = cli.bootstrap_peers;
    }
    if let Some(max_peers) = cli.max_peers {
        config.max_peers = max_peers;
    }
    config.enable_metrics |= cli.metrics;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = build_config(Cli::parse())?;
    init_logging(config.log_format, &config.log_level)?;

    let addr: SocketAddr = config
        .rpc_addr()
        .parse()
        .with_context(|| format!("invalid RPC address {}", config.rpc_addr()))?;
    tracing::info!(
        "Starting denaro node on {} network (RPC: {addr})",
        config.network.as_str()
    );
    if !config.bootstrap_peers.is_empty() {
        tracing::info!("Bootstrap peers: {}", config.bootstrap_peers.join(", "));
    }

    let node = DenaroNode::open(config).await?;
    let background = node.spawn_background();

    let server = tokio::spawn(RpcServer::new(addr, node.clone()).serve(node.shutdown_controller().subscribe()));

    if !node.get_nodes().await.is_empty() {
        match node.sync_blockchain(None) {
            Ok(start) => tracing::info!(?start, "initial sync"),
            Err(e) => tracing::warn!(error = %e, "initial sync not started"),
        }
    }

    node.shutdown_controller().wait_for_signal().await;
    tracing::info!("Shutdown signal received, stopping node");

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "RPC server failed"),
        Err(e) => tracing::error!(error = %e, "RPC server task panicked"),
    }
    for handle in background {
        let _ = handle.await;
    }

    tracing::info!("denaro daemon exited cleanly");
    Ok(())
}
