//! Off-chain head tracker for EVM-style chains.
//!
//! - **BlockTracker**: polls the current head of a JSON-RPC endpoint (or any [BlockSource])
//!   and emits one [TrackerEvent] per new head over a single-slot channel.
//! - **Reconciler**: in reconciling mode, attaches each head to a bounded [History] and
//!   reports the blocks added to and removed from the canonical chain, backfilling missing
//!   parents by hash and unwinding reorgs down to their fork point.

pub mod block;
pub mod client;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod history;
pub mod reconciler;
pub mod tracker;

pub use block::{Block, BlockHash, BlockHeader};
pub use client::{BlockSource, ClientError, RpcClient};
pub use config::{ConfigError, RpcConfig, TrackerConfig};
pub use cursor::HeadCursor;
pub use dispatch::{ConsumerGone, Dispatcher, TrackerEvent};
pub use history::History;
pub use reconciler::{Event, ReconcileError, Reconciler};
pub use tracker::{BlockTracker, EventReceiver, TrackerBuilder};
