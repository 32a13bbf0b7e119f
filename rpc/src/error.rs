//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::envelope::ApiResponse;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error("{0}")]
    Node(#[from] denaro_node::NodeError),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::Node(denaro_node::NodeError::BadRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Node(denaro_node::NodeError::Peer(_)) => StatusCode::BAD_REQUEST,
            Self::Node(_) | Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::fail(self.to_string()))).into_response()
    }
}
