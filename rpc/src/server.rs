//! Axum-based RPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use denaro_node::DenaroNode;

use crate::error::RpcError;
use crate::handlers;

/// Build the router serving every node operation.
pub fn router(node: Arc<DenaroNode>) -> Router {
    Router::new()
        .route("/", get(handlers::info).post(handlers::info))
        .route("/push_tx", get(handlers::push_tx).post(handlers::push_tx))
        .route("/push_block", get(handlers::push_block).post(handlers::push_block))
        .route(
            "/get_mining_info",
            get(handlers::get_mining_info).post(handlers::get_mining_info),
        )
        .route(
            "/get_address_info",
            get(handlers::get_address_info).post(handlers::get_address_info),
        )
        .route("/add_node", get(handlers::add_node).post(handlers::add_node))
        .route("/get_nodes", get(handlers::get_nodes).post(handlers::get_nodes))
        .route(
            "/sync_blockchain",
            get(handlers::sync_blockchain).post(handlers::sync_blockchain),
        )
        .route(
            "/get_pending_transactions",
            get(handlers::get_pending_transactions).post(handlers::get_pending_transactions),
        )
        .route(
            "/get_transaction",
            get(handlers::get_transaction).post(handlers::get_transaction),
        )
        .route("/get_block", get(handlers::get_block).post(handlers::get_block))
        .route("/get_blocks", get(handlers::get_blocks).post(handlers::get_blocks))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(node)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    debug!(%method, %path, status = response.status().as_u16(), "rpc request");
    response
}

pub struct RpcServer {
    addr: SocketAddr,
    node: Arc<DenaroNode>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, node: Arc<DenaroNode>) -> Self {
        Self { addr, node }
    }

    /// Serve until `shutdown` fires.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        info!("RPC server listening on {}", self.addr);
        axum::serve(listener, router(self.node))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("RPC server stopped");
        Ok(())
    }
}
