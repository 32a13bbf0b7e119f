//! Wallet state and the node HTTP client it talks through.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use denaro_crypto::{derive_address, validate_address};
use denaro_store::UnspentOutput;
use denaro_types::{Address, Amount, ConsensusParams, KeyPair, TxHash};

use crate::coin_selector::select_inputs;
use crate::error::WalletError;
use crate::keystore::WalletFile;
use crate::transaction_builder::{build_payment, Payment};

// ── NodeClient ──────────────────────────────────────────────────────────

/// HTTP client for the node RPC.
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    node_url: String,
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpendableEntry {
    pub tx_hash: String,
    pub index: u8,
    pub amount: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PendingSpentEntry {
    pub tx_hash: String,
    pub index: u8,
}

/// The parts of `get_address_info` the wallet uses.
#[derive(Clone, Debug, Deserialize)]
pub struct AddressSummary {
    pub balance: String,
    #[serde(default)]
    pub spendable_outputs: Vec<SpendableEntry>,
    #[serde(default)]
    pub pending_spent_outputs: Option<Vec<PendingSpentEntry>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PushTxResult {
    pub accepted: bool,
    pub hash: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NodeClient {
    /// Create a client for the node at `node_url` (e.g. `http://127.0.0.1:3006`).
    pub fn new(node_url: impl Into<String>) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WalletError::Node(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            node_url: node_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    /// POST `params` to `/{action}` and decode the envelope's `result`.
    async fn call<T: DeserializeOwned>(&self, action: &str, params: serde_json::Value) -> Result<T, WalletError> {
        let url = format!("{}/{action}", self.node_url);
        debug!(%url, "wallet rpc call");
        let response = self
            .http
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| WalletError::Node(format!("request failed: {e}")))?;
        let status = response.status();
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| WalletError::Node(format!("invalid response (HTTP {status}): {e}")))?;

        if !envelope.ok {
            return Err(WalletError::Refused(
                envelope.error.unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }
        let result = envelope.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(|e| WalletError::Node(format!("invalid {action} response: {e}")))
    }

    pub async fn get_address_info(&self, address: &Address, show_pending: bool) -> Result<AddressSummary, WalletError> {
        self.call(
            "get_address_info",
            json!({
                "address": address.as_str(),
                "transactions_count_limit": 0,
                "show_pending": show_pending,
            }),
        )
        .await
    }

    pub async fn push_tx(&self, tx_hex: &str) -> Result<PushTxResult, WalletError> {
        self.call("push_tx", json!({ "tx_hex": tx_hex })).await
    }
}

// ── Wallet ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressBalance {
    pub address: Address,
    pub balance: Amount,
    /// Balance once pending transactions confirm.
    pub pending_balance: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPayment {
    pub hash: TxHash,
    pub inputs: usize,
    pub change: Amount,
}

/// A set of keys backed by a wallet file, spending through one node.
pub struct Wallet {
    path: PathBuf,
    file: WalletFile,
    keys: Vec<KeyPair>,
    client: NodeClient,
    params: ConsensusParams,
}

impl Wallet {
    /// Open the wallet file at `path` (missing means empty).
    pub fn open(path: impl AsRef<Path>, client: NodeClient) -> Result<Self, WalletError> {
        let path = path.as_ref().to_path_buf();
        let file = WalletFile::load(&path)?;
        let keys = file.keys()?;
        Ok(Self {
            path,
            file,
            keys,
            client,
            params: ConsensusParams::main(),
        })
    }

    pub fn client(&self) -> &NodeClient {
        &self.client
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.keys.iter().map(|k| derive_address(&k.public)).collect()
    }

    /// Append a fresh key, persist it, and return its address.
    pub fn create_address(&mut self) -> Result<Address, WalletError> {
        let address = self.file.add_new_key();
        self.file.save(&self.path)?;
        self.keys = self.file.keys()?;
        info!(%address, "address created");
        Ok(address)
    }

    /// Committed and pending balance of every address.
    pub async fn balances(&self) -> Result<Vec<AddressBalance>, WalletError> {
        let mut balances = Vec::with_capacity(self.keys.len());
        for address in self.addresses() {
            let committed = self.client.get_address_info(&address, false).await?;
            let pending = self.client.get_address_info(&address, true).await?;
            balances.push(AddressBalance {
                balance: parse_amount(&committed.balance)?,
                pending_balance: parse_amount(&pending.balance)?,
                address,
            });
        }
        Ok(balances)
    }

    /// Outputs the node reports as spendable, excluding ones already reserved
    /// by pending transactions.
    pub async fn spendable_outputs(&self) -> Result<Vec<UnspentOutput>, WalletError> {
        let mut outputs = Vec::new();
        for address in self.addresses() {
            let info = self.client.get_address_info(&address, true).await?;
            for entry in info.spendable_outputs {
                outputs.push(UnspentOutput {
                    tx_hash: TxHash::from_hex(&entry.tx_hash)
                        .map_err(|e| WalletError::Node(format!("bad output hash: {e}")))?,
                    index: entry.index,
                    address: address.clone(),
                    amount: parse_amount(&entry.amount)?,
                });
            }
        }
        Ok(outputs)
    }

    /// Pay `amount` to `to`. Change goes to `change_to`, or to the first
    /// address of the wallet.
    pub async fn send(
        &self,
        to: &str,
        amount: &str,
        message: Option<&str>,
        change_to: Option<&str>,
    ) -> Result<SentPayment, WalletError> {
        let to = validate_address(to).map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
        let amount = parse_amount(amount)?;
        let change_to = match change_to {
            Some(raw) => validate_address(raw).map_err(|e| WalletError::InvalidAddress(e.to_string()))?,
            None => self.addresses().into_iter().next().ok_or(WalletError::NoKeys)?,
        };

        let available = self.spendable_outputs().await?;
        let selection = select_inputs(&available, amount)?;
        let tx = build_payment(
            &self.keys,
            &selection,
            Payment {
                to: &to,
                amount,
                change_to: &change_to,
                message: message.map(|m| m.as_bytes().to_vec()),
            },
            self.params.max_message_len,
        )?;

        let pushed = self.client.push_tx(&tx.to_hex()).await?;
        if !pushed.accepted {
            return Err(WalletError::Refused(
                pushed.reason.unwrap_or_else(|| "transaction not accepted".into()),
            ));
        }
        info!(hash = %pushed.hash, %to, %amount, "payment sent");
        Ok(SentPayment {
            hash: tx.hash(),
            inputs: selection.inputs.len(),
            change: selection.change,
        })
    }
}

fn parse_amount(raw: &str) -> Result<Amount, WalletError> {
    raw.parse().map_err(|_| WalletError::InvalidAmount(raw.to_string()))
}
