//! BlockTracker: polls the chain head and emits fork-aware block events.
//!
//! One task owns the history and the head cursor. Each tick fetches the current head,
//! skips it if unchanged, and either forwards it as-is or reconciles it against history.
//! Delivery to the consumer waits for room, so a slow consumer slows polling down.

use crate::block::{Block, BlockHeader};
use crate::client::{BlockSource, ClientError, RpcClient};
use crate::config::{ConfigError, TrackerConfig};
use crate::cursor::HeadCursor;
use crate::dispatch::{ConsumerGone, Dispatcher, TrackerEvent};
use crate::reconciler::{ReconcileError, Reconciler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Receiving end handed to the consumer.
pub type EventReceiver<B> = mpsc::Receiver<TrackerEvent<B>>;

/// Builder for the tracker.
pub struct TrackerBuilder<C> {
    client: Arc<C>,
    config: TrackerConfig,
}

impl<C: BlockSource> TrackerBuilder<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: TrackerConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reconcile(mut self, reconcile: bool) -> Self {
        self.config.reconcile = reconcile;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    pub fn max_backfill_depth(mut self, depth: usize) -> Self {
        self.config.max_backfill_depth = depth;
        self
    }

    pub fn build(self) -> Result<(BlockTracker<C>, EventReceiver<C::Block>), ConfigError> {
        self.config.validate()?;
        Ok(BlockTracker::from_config(self.client, &self.config))
    }
}

enum Mode<B> {
    Raw,
    Reconcile(Reconciler<B>),
}

/// Follows the head of one chain. Consumes itself when started.
pub struct BlockTracker<C: BlockSource> {
    client: Arc<C>,
    poll_interval: Duration,
    cursor: HeadCursor,
    mode: Mode<C::Block>,
    dispatcher: Dispatcher<C::Block>,
}

impl<C: BlockSource> BlockTracker<C> {
    /// Tracker with default settings. `reconcile` selects added/removed events over bare blocks.
    pub fn new(client: Arc<C>, reconcile: bool) -> (Self, EventReceiver<C::Block>) {
        let config = TrackerConfig {
            reconcile,
            ..Default::default()
        };
        Self::from_config(client, &config)
    }

    fn from_config(client: Arc<C>, config: &TrackerConfig) -> (Self, EventReceiver<C::Block>) {
        let mode = if config.reconcile {
            Mode::Reconcile(Reconciler::new(
                config.history_capacity,
                config.max_backfill_depth,
            ))
        } else {
            Mode::Raw
        };
        let (dispatcher, rx) = Dispatcher::channel();
        let tracker = Self {
            client,
            poll_interval: config.poll_interval,
            cursor: HeadCursor::new(),
            mode,
            dispatcher,
        };
        (tracker, rx)
    }

    pub fn builder(client: Arc<C>) -> TrackerBuilder<C> {
        TrackerBuilder::new(client)
    }

    pub fn is_reconciling(&self) -> bool {
        matches!(self.mode, Mode::Reconcile(_))
    }

    /// Spawn the poll loop on the current runtime.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run the poll loop until `shutdown` flips to true (or its sender is dropped) or the
    /// consumer goes away. Shutdown is only observed between polls.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval = ?self.poll_interval,
            reconcile = self.is_reconciling(),
            "block tracker started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = sleep(self.poll_interval) => {}
            }
            if self.poll().await.is_err() {
                tracing::info!("event receiver dropped, stopping");
                return;
            }
        }
        tracing::info!("block tracker stopped");
    }

    /// One poll: fetch the head and, if new, process it.
    async fn poll(&mut self) -> Result<(), ConsumerGone> {
        let head = match self.client.head().await {
            Ok(block) => block,
            Err(e) => {
                tracing::debug!(reason = %e, "head fetch failed");
                return Ok(());
            }
        };
        if !self.cursor.advance(head.hash()) {
            tracing::debug!(hash = %head.hash(), "head unchanged");
            return Ok(());
        }
        tracing::info!(hash = %head.hash(), "new head");
        self.process(head).await
    }

    async fn process(&mut self, head: C::Block) -> Result<(), ConsumerGone> {
        let reconciler = match &mut self.mode {
            Mode::Raw => {
                return self
                    .dispatcher
                    .dispatch(TrackerEvent::Block { block: head })
                    .await;
            }
            Mode::Reconcile(reconciler) => reconciler,
        };
        match reconciler.reconcile(&*self.client, head).await {
            Ok(Some(event)) => {
                tracing::info!(
                    added = event.added.len(),
                    removed = event.removed.len(),
                    "chain updated"
                );
                self.dispatcher
                    .dispatch(TrackerEvent::Reconciled(event))
                    .await
            }
            Ok(None) => Ok(()),
            Err(e @ ReconcileError::BackfillLimit { .. }) => {
                tracing::warn!(reason = %e, "failed to reconcile, resetting history");
                reconciler.reset();
                self.cursor.clear();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(reason = %e, "failed to reconcile");
                Ok(())
            }
        }
    }
}

impl BlockTracker<RpcClient> {
    /// Tracker following the JSON-RPC endpoint at `url`.
    pub fn with_endpoint(
        url: impl Into<String>,
        reconcile: bool,
    ) -> Result<(Self, EventReceiver<BlockHeader>), ClientError> {
        let client = RpcClient::from_url(url)?;
        Ok(Self::new(Arc::new(client), reconcile))
    }
}
