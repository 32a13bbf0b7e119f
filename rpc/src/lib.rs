//! HTTP RPC surface of the denaro node.
//!
//! Routes mirror the node operations one to one. Every response is an
//! `{ok, result | error}` envelope.

pub mod envelope;
pub mod error;
pub mod handlers;
pub mod server;

pub use envelope::{ApiResponse, Params};
pub use error::RpcError;
pub use server::{router, RpcServer};
