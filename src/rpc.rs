//! Solana JSON-RPC access for wallet balance and transaction history.
//!
//! The controller only sees the [`LedgerClient`] trait, so tests and future
//! decoders can substitute their own implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Pubkey;
use crate::error::{DashboardError, Result};

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// One entry from `getSignaturesForAddress`, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureRef {
    pub signature: String,
    pub block_time: Option<i64>,
}

/// The parts of a parsed transaction the history fetcher reads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionDetail {
    pub block_time: Option<i64>,
    pub account_keys: Vec<String>,
    pub log_messages: Vec<String>,
}

impl TransactionDetail {
    pub fn references(&self, program: &Pubkey) -> bool {
        self.account_keys.iter().any(|k| k == program.as_str())
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance of `identity` in lamports.
    async fn get_balance(&self, identity: &Pubkey) -> Result<u64>;

    /// Most recent `limit` signatures involving `identity`, newest first.
    async fn get_recent_signatures(&self, identity: &Pubkey, limit: usize) -> Result<Vec<SignatureRef>>;

    /// Resolve signatures to details, aligned with the input. `None` where
    /// the node has no record or no metadata for a signature.
    async fn get_parsed_transactions(&self, signatures: &[String]) -> Result<Vec<Option<TransactionDetail>>>;
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[serde(default)]
    id: Option<u64>,
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    value: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignature {
    signature: String,
    block_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    block_time: Option<i64>,
    meta: Option<RawMeta>,
    transaction: RawTransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    #[serde(default)]
    log_messages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawTransactionBody {
    message: RawMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    account_keys: Vec<RawAccountKey>,
}

/// `jsonParsed` encoding yields objects; legacy encodings yield plain strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAccountKey {
    Parsed { pubkey: String },
    Plain(String),
}

impl RawAccountKey {
    fn into_string(self) -> String {
        match self {
            RawAccountKey::Parsed { pubkey } => pubkey,
            RawAccountKey::Plain(s) => s,
        }
    }
}

impl RawTransaction {
    fn into_detail(self) -> Option<TransactionDetail> {
        let meta = self.meta?;
        Some(TransactionDetail {
            block_time: self.block_time,
            account_keys: self
                .transaction
                .message
                .account_keys
                .into_iter()
                .map(RawAccountKey::into_string)
                .collect(),
            log_messages: meta.log_messages.unwrap_or_default(),
        })
    }
}

fn unwrap_response<T>(response: RpcResponse<T>) -> Result<T> {
    if let Some(error) = response.error {
        return Err(DashboardError::Rpc { code: error.code, message: error.message });
    }
    response
        .result
        .ok_or_else(|| DashboardError::Decode("response carried neither result nor error".into()))
}

// ── Client ──

/// JSON-RPC client for a Solana cluster endpoint.
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: Client,
    rpc_url: String,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            rpc_url: rpc_url.into(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, url = %self.rpc_url, "rpc call");

        let response = self.http.post(&self.rpc_url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(DashboardError::Http(format!("{} returned {}", method, response.status())));
        }
        let body: RpcResponse<T> = response.json().await?;
        unwrap_response(body)
    }
}

#[async_trait]
impl LedgerClient for SolanaRpcClient {
    async fn get_balance(&self, identity: &Pubkey) -> Result<u64> {
        let result: BalanceResult = self.call("getBalance", json!([identity.as_str()])).await?;
        Ok(result.value)
    }

    async fn get_recent_signatures(&self, identity: &Pubkey, limit: usize) -> Result<Vec<SignatureRef>> {
        let raw: Vec<RawSignature> = self
            .call("getSignaturesForAddress", json!([identity.as_str(), { "limit": limit }]))
            .await?;
        Ok(raw
            .into_iter()
            .map(|s| SignatureRef { signature: s.signature, block_time: s.block_time })
            .collect())
    }

    async fn get_parsed_transactions(&self, signatures: &[String]) -> Result<Vec<Option<TransactionDetail>>> {
        if signatures.is_empty() {
            return Ok(Vec::new());
        }

        // One JSON-RPC batch; ids are input positions.
        let batch: Vec<Value> = signatures
            .iter()
            .enumerate()
            .map(|(i, sig)| {
                json!({
                    "jsonrpc": "2.0",
                    "id": i,
                    "method": "getTransaction",
                    "params": [sig, { "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 }],
                })
            })
            .collect();
        tracing::debug!(count = signatures.len(), url = %self.rpc_url, "rpc batch getTransaction");

        let response = self.http.post(&self.rpc_url).json(&batch).send().await?;
        if !response.status().is_success() {
            return Err(DashboardError::Http(format!("getTransaction batch returned {}", response.status())));
        }
        let replies: Vec<RpcResponse<Option<RawTransaction>>> = response.json().await?;

        let mut details: Vec<Option<TransactionDetail>> = vec![None; signatures.len()];
        for reply in replies {
            let idx = reply
                .id
                .map(|id| id as usize)
                .filter(|&id| id < signatures.len())
                .ok_or_else(|| DashboardError::Decode("batch reply with unknown id".into()))?;
            if let Some(error) = reply.error {
                return Err(DashboardError::Rpc { code: error.code, message: error.message });
            }
            details[idx] = reply.result.flatten().and_then(RawTransaction::into_detail);
        }
        Ok(details)
    }
}
