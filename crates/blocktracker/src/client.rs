//! Block retrieval: the [BlockSource] capability and its JSON-RPC implementation.

use crate::block::{decode_block_header, Block, BlockHash, BlockHeader, DecodeError};
use crate::config::RpcConfig;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("block {0} not found")]
    NotFound(BlockHash),
}

impl From<DecodeError> for ClientError {
    fn from(e: DecodeError) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Read-only access to a chain. Shared between trackers; latency is arbitrary and calls
/// may fail transiently.
pub trait BlockSource: Send + Sync + 'static {
    type Block: Block;

    /// Fetch a block by hash. A block the source does not know is [ClientError::NotFound].
    fn block_by_hash(
        &self,
        hash: BlockHash,
    ) -> impl Future<Output = Result<Self::Block, ClientError>> + Send;

    /// Fetch the block currently at the head of the chain.
    fn head(&self) -> impl Future<Output = Result<Self::Block, ClientError>> + Send;
}

/// Ethereum JSON-RPC block source over HTTP.
pub struct RpcClient {
    http_client: reqwest::Client,
    http_url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .no_proxy()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            http_url: config.http_url,
            next_id: AtomicU64::new(1),
        })
    }

    /// Client for `url` with default timeouts.
    pub fn from_url(url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(RpcConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.http_url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        let resp = self
            .http_client
            .post(&self.http_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let json: Value = resp.json().await?;
        rpc_result(json)
    }
}

/// Unwrap a JSON-RPC response envelope.
fn rpc_result(mut json: Value) -> Result<Value, ClientError> {
    if let Some(err) = json.get("error") {
        return Err(ClientError::Rpc(err.to_string()));
    }
    json.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| ClientError::Decode("Missing result".into()))
}

impl BlockSource for RpcClient {
    type Block = BlockHeader;

    fn block_by_hash(
        &self,
        hash: BlockHash,
    ) -> impl Future<Output = Result<BlockHeader, ClientError>> + Send {
        async move {
            let result = self
                .call("eth_getBlockByHash", json!([hash.to_string(), false]))
                .await?;
            if result.is_null() {
                return Err(ClientError::NotFound(hash));
            }
            Ok(decode_block_header(&result)?)
        }
    }

    fn head(&self) -> impl Future<Output = Result<BlockHeader, ClientError>> + Send {
        async move {
            let result = self
                .call("eth_getBlockByNumber", json!(["latest", false]))
                .await?;
            if result.is_null() {
                return Err(ClientError::Decode("latest block missing".into()));
            }
            Ok(decode_block_header(&result)?)
        }
    }
}
