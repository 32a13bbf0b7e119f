//! [`PeerTransport`] over HTTP with `reqwest`.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::transport::{PeerTransport, WireBlock, SENDER_HEADER};
use crate::TransportError;

/// The `{ok, result, error}` envelope every node answers with.
#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct NodeInfo {
    version: String,
}

#[derive(Deserialize)]
struct MiningInfo {
    last_block: Option<LastBlock>,
}

#[derive(Deserialize)]
struct LastBlock {
    id: u64,
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    probe_timeout: Duration,
}

impl HttpTransport {
    /// `request_timeout` bounds every call; probes use the shorter `probe_timeout`.
    pub fn new(request_timeout: Duration, probe_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            probe_timeout,
        })
    }

    fn map_err(url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout { url: url.to_string() }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        endpoint: String,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let mut request = self.client.get(&endpoint);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(|e| Self::map_err(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let envelope: Envelope<T> = response.json().await.map_err(|e| TransportError::Response {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TransportError::Response {
                url: url.to_string(),
                reason: envelope.error.unwrap_or_else(|| "missing result".into()),
            }),
        }
    }
}

impl PeerTransport for HttpTransport {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            let info: NodeInfo = self
                .get_json(url, format!("{url}/"), Some(self.probe_timeout))
                .await?;
            if info.version.is_empty() {
                return Err(TransportError::Response {
                    url: url.to_string(),
                    reason: "empty version".into(),
                });
            }
            Ok(())
        }
        .boxed()
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        path: &'a str,
        body: &'a serde_json::Value,
        sender: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            let mut request = self.client.post(format!("{url}/{path}")).json(body);
            if let Some(sender) = sender {
                request = request.header(SENDER_HEADER, sender);
            }
            let response = request.send().await.map_err(|e| Self::map_err(url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok(())
        }
        .boxed()
    }

    fn chain_height<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<u64, TransportError>> {
        async move {
            let info: MiningInfo = self
                .get_json(url, format!("{url}/get_mining_info"), None)
                .await?;
            Ok(info.last_block.map_or(0, |b| b.id))
        }
        .boxed()
    }

    fn get_blocks<'a>(
        &'a self,
        url: &'a str,
        offset: u64,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<WireBlock>, TransportError>> {
        async move {
            self.get_json(url, format!("{url}/get_blocks?offset={offset}&limit={limit}"), None)
                .await
        }
        .boxed()
    }
}
