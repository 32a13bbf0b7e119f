//! denaro full node.
//!
//! The node is the central coordinator that:
//! - Admits pushed transactions into the mempool and relays them
//! - Runs every block through the acceptance pipeline and commits it
//! - Keeps the difficulty window of the committed chain
//! - Syncs missing blocks from peers
//! - Answers the read-side RPC operations

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod pipeline;
pub mod shutdown;
pub mod sync;
pub mod tracing_spans;

pub use api::{
    AddressInfo, BlockDetail, BlockEntry, BlockTransactions, BlockView, MiningInfo, NodeInfo, PushBlockOutcome,
    PushBlockRequest, SyncStart, TxOutcome, TxRef, TxView,
};
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::DenaroNode;
pub use pipeline::{BlockOutcome, BlockPipeline, BlockSource, InboundBlock, PipelineStage, RejectReason};
pub use shutdown::ShutdownController;
pub use sync::{decode_wire_block, ChainSynchronizer, SyncGuard, SyncReport};
