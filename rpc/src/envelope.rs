//! The `{ok, result, error}` envelope and the request extractor shared by all
//! routes.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use axum::http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RpcError;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(result: T) -> Result<Self, RpcError> {
        let result = serde_json::to_value(result).map_err(|e| RpcError::Server(e.to_string()))?;
        Ok(Self {
            ok: true,
            result: Some(result),
            error: None,
        })
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Request parameters from the query string on GET, or from a JSON body on
/// POST. A POST without a body falls back to the query string.
pub struct Params<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = RpcError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let from_query = |uri: &axum::http::Uri| {
            Query::<T>::try_from_uri(uri)
                .map(|Query(params)| Self(params))
                .map_err(|e| RpcError::InvalidRequest(e.body_text()))
        };
        if req.method() == Method::GET {
            return from_query(req.uri());
        }
        let uri = req.uri().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return from_query(&uri);
        }
        serde_json::from_slice(&body)
            .map(Self)
            .map_err(|e| RpcError::InvalidRequest(e.to_string()))
    }
}
