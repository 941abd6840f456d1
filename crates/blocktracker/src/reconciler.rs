//! Reconciler: turns a newly observed head into added/removed blocks.
//!
//! The observed block is attached to retained history at its fork point. When its parent
//! is unknown, ancestors are fetched one parent-hash hop at a time until one of them
//! links into history; reorgs and gaps are the same search. Nothing is mutated until
//! every fetch has succeeded, so a failed reconciliation leaves history untouched.

use crate::block::{Block, BlockHash};
use crate::client::{BlockSource, ClientError};
use crate::history::History;
use serde::Serialize;
use thiserror::Error;

/// Blocks that joined and left the canonical chain in one reconciliation, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event<B> {
    pub added: Vec<B>,
    pub removed: Vec<B>,
}

impl<B> Default for Event<B> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<B> Event<B> {
    pub fn is_reorg(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("parent with hash {hash} not found: {source}")]
    ParentNotFound {
        hash: BlockHash,
        #[source]
        source: ClientError,
    },
    #[error("no fork point within {depth} ancestors of {head}")]
    BackfillLimit { head: BlockHash, depth: usize },
}

/// Owns the history and applies observed blocks to it.
#[derive(Debug)]
pub struct Reconciler<B> {
    history: History<B>,
    max_backfill_depth: usize,
}

impl<B: Block> Reconciler<B> {
    pub fn new(history_capacity: usize, max_backfill_depth: usize) -> Self {
        Self {
            history: History::new(history_capacity),
            max_backfill_depth,
        }
    }

    /// Seed with already known blocks, oldest first.
    pub fn with_history(
        blocks: impl IntoIterator<Item = B>,
        history_capacity: usize,
        max_backfill_depth: usize,
    ) -> Self {
        let mut reconciler = Self::new(history_capacity, max_backfill_depth);
        for block in blocks {
            reconciler.history.append(block);
        }
        reconciler
    }

    pub fn history(&self) -> &History<B> {
        &self.history
    }

    /// Forget all retained blocks.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Apply `observed`, backfilling from `source` as needed. `Ok(None)` when the block
    /// is already part of history.
    pub async fn reconcile<S>(
        &mut self,
        source: &S,
        observed: B,
    ) -> Result<Option<Event<B>>, ReconcileError>
    where
        S: BlockSource<Block = B>,
    {
        if self.history.is_empty() {
            self.history.append(observed.clone());
            return Ok(Some(Event {
                added: vec![observed],
                removed: Vec::new(),
            }));
        }
        if self.history.contains(&observed) {
            return Ok(None);
        }

        let head = observed.hash();
        let mut parent = observed.parent_hash();
        // Newest first; pending[0] is the observed block.
        let mut pending = vec![observed];
        let fork_point = loop {
            if self.history.last().map(|b| b.hash()) == Some(parent) {
                break self.history.len() - 1;
            }
            if let Some(index) = self.history.index_of(&parent) {
                break index;
            }
            if pending.len() > self.max_backfill_depth {
                return Err(ReconcileError::BackfillLimit {
                    head,
                    depth: self.max_backfill_depth,
                });
            }
            tracing::debug!(%parent, "backfilling missing parent");
            let block = source
                .block_by_hash(parent)
                .await
                .map_err(|source| ReconcileError::ParentNotFound {
                    hash: parent,
                    source,
                })?;
            parent = block.parent_hash();
            pending.push(block);
        };

        let removed = self.history.truncate_after(fork_point);
        if !removed.is_empty() {
            tracing::info!(
                depth = removed.len(),
                fork_point = %self.history.last().map(|b| b.hash()).unwrap_or_default(),
                "chain reorganization"
            );
        }
        pending.reverse();
        for block in &pending {
            self.history.append(block.clone());
        }
        Ok(Some(Event {
            added: pending,
            removed,
        }))
    }
}
