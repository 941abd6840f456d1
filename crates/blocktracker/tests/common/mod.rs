//! Common helpers for integration tests.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid per-binary warnings.
#![allow(dead_code)]

use anyhow::{Context, Result};
use blocktracker::{Block, BlockHash, BlockSource, ClientError};
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::future::Future;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// In-memory block with a human-readable label; hash is keccak256(label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBlock {
    pub label: &'static str,
    hash: BlockHash,
    parent: BlockHash,
}

fn label_hash(label: &str) -> BlockHash {
    let digest = Keccak256::digest(label.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    BlockHash(out)
}

impl TestBlock {
    /// Block whose parent is not a `TestBlock` (e.g. the first block of a scenario).
    pub fn root(label: &'static str) -> Self {
        Self {
            label,
            hash: label_hash(label),
            parent: label_hash(&format!("parent-of-{label}")),
        }
    }

    pub fn child(label: &'static str, parent: &TestBlock) -> Self {
        Self {
            label,
            hash: label_hash(label),
            parent: parent.hash,
        }
    }
}

impl Block for TestBlock {
    fn hash(&self) -> BlockHash {
        self.hash
    }

    fn parent_hash(&self) -> BlockHash {
        self.parent
    }
}

/// Linear chain `labels[0] <- labels[1] <- ...`.
pub fn linear(labels: &[&'static str]) -> Vec<TestBlock> {
    let mut out: Vec<TestBlock> = Vec::with_capacity(labels.len());
    for &label in labels {
        let block = match out.last() {
            Some(parent) => TestBlock::child(label, parent),
            None => TestBlock::root(label),
        };
        out.push(block);
    }
    out
}

pub fn labels(blocks: &[TestBlock]) -> Vec<&'static str> {
    blocks.iter().map(|b| b.label).collect()
}

/// Scripted block source: a set of fetchable blocks plus a settable head.
#[derive(Default)]
pub struct MockChain {
    blocks: Mutex<HashMap<BlockHash, TestBlock>>,
    head: Mutex<Option<TestBlock>>,
    head_failures: AtomicUsize,
    head_calls: AtomicUsize,
    hash_calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, blocks: &[TestBlock]) {
        let mut map = self.blocks.lock().unwrap();
        for b in blocks {
            map.insert(b.hash(), b.clone());
        }
    }

    /// Make `block` the head (and fetchable by hash).
    pub fn set_head(&self, block: &TestBlock) {
        self.insert(std::slice::from_ref(block));
        *self.head.lock().unwrap() = Some(block.clone());
    }

    /// The next `n` head requests fail.
    pub fn fail_heads(&self, n: usize) {
        self.head_failures.store(n, Ordering::SeqCst);
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::SeqCst)
    }
}

impl BlockSource for MockChain {
    type Block = TestBlock;

    fn block_by_hash(
        &self,
        hash: BlockHash,
    ) -> impl Future<Output = Result<TestBlock, ClientError>> + Send {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        let found = self.blocks.lock().unwrap().get(&hash).cloned();
        async move { found.ok_or(ClientError::NotFound(hash)) }
    }

    fn head(&self) -> impl Future<Output = Result<TestBlock, ClientError>> + Send {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .head_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let head = self.head.lock().unwrap().clone();
        async move {
            if failing {
                return Err(ClientError::Rpc("connection reset".into()));
            }
            head.ok_or_else(|| ClientError::Rpc("no head yet".into()))
        }
    }
}

/// One JSON-RPC call against a local node. Proxies are bypassed so CI sandboxes do not interfere.
pub async fn rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let client = reqwest::Client::builder().no_proxy().build()?;
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
    let v: Value = client
        .post(url)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("{method}: HTTP request"))?
        .error_for_status()?
        .json()
        .await
        .with_context(|| format!("{method}: parse response"))?;
    if let Some(err) = v.get("error") {
        anyhow::bail!("{method}: RPC error {err}");
    }
    v.get("result")
        .cloned()
        .with_context(|| format!("{method}: missing result"))
}

/// Snapshot chain state; the returned id is consumed by [evm_revert].
pub async fn evm_snapshot(url: &str) -> Result<String> {
    let id = rpc(url, "evm_snapshot", json!([])).await?;
    id.as_str()
        .map(str::to_owned)
        .context("snapshot id is not a string")
}

pub async fn evm_revert(url: &str, snapshot: &str) -> Result<bool> {
    rpc(url, "evm_revert", json!([snapshot]))
        .await?
        .as_bool()
        .context("evm_revert result is not a bool")
}

/// Mine `n` empty blocks, one request each so every block is a separate head.
pub async fn evm_mine(url: &str, n: u64) -> Result<()> {
    for _ in 0..n {
        rpc(url, "evm_mine", json!([])).await?;
    }
    Ok(())
}

/// Pin the timestamp of the next mined block, so a re-mined branch gets fresh hashes.
pub async fn evm_set_next_block_timestamp(url: &str, timestamp: u64) -> Result<()> {
    rpc(url, "evm_setNextBlockTimestamp", json!([timestamp])).await?;
    Ok(())
}

/// True if `anvil` is in PATH.
/// Use at the start of integration tests to skip when not in CI/local dev with Foundry.
pub fn anvil_available() -> bool {
    Command::new("anvil")
        .arg("--help")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Spawn Anvil on a dynamic port and wait until ready.
pub async fn spawn_anvil() -> Result<(Child, String)> {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")
            .context("bind for port")?;
        listener.local_addr()?.port()
    };
    let rpc_url = format!("http://127.0.0.1:{}", port);
    let mut cmd = Command::new("anvil");
    cmd.arg("--port").arg(port.to_string()).arg("--host").arg("127.0.0.1");
    cmd.stdout(Stdio::null()).stderr(Stdio::null());
    let process = cmd.spawn().context("spawn anvil")?;
    wait_for_rpc(&rpc_url).await?;
    Ok((process, rpc_url))
}

async fn wait_for_rpc(url: &str) -> Result<()> {
    for _ in 0..30 {
        if rpc(url, "eth_blockNumber", json!([])).await.is_ok() {
            return Ok(());
        }
        sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("RPC not ready");
}
