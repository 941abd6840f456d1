//! Tracker and RPC client configuration.

use crate::history::DEFAULT_CAPACITY;
use std::time::Duration;
use thiserror::Error;

/// Default delay between two head polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Delay between two head polls.
    pub poll_interval: Duration,
    /// Number of blocks kept in history.
    pub history_capacity: usize,
    /// Most ancestors a single reconciliation may fetch before giving up.
    pub max_backfill_depth: usize,
    /// Emit added/removed events instead of bare head blocks.
    pub reconcile: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_capacity: DEFAULT_CAPACITY,
            max_backfill_depth: DEFAULT_CAPACITY,
            reconcile: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll_interval must be non-zero")]
    ZeroPollInterval,
    #[error("history_capacity must be at least 1")]
    ZeroHistoryCapacity,
    #[error("max_backfill_depth must be at least 1")]
    ZeroBackfillDepth,
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if self.max_backfill_depth == 0 {
            return Err(ConfigError::ZeroBackfillDepth);
        }
        Ok(())
    }
}

/// JSON-RPC endpoint settings.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// HTTP RPC URL (eth_getBlockByHash, eth_getBlockByNumber).
    pub http_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RpcConfig {
    pub fn new(http_url: impl Into<String>) -> Self {
        Self {
            http_url: http_url.into(),
            request_timeout: Duration::from_secs(10),
        }
    }
}
