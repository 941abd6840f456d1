//! In-memory head cursor for the poll loop (no disk persistence).
//!
//! Process restarts begin with an empty cursor, so the first head is always reported.

use crate::block::BlockHash;

/// Hash of the last head handed on by the poller.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadCursor {
    pub last_observed: Option<BlockHash>,
}

impl HeadCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` as the latest head. Returns false if it was already the latest.
    pub fn advance(&mut self, hash: BlockHash) -> bool {
        if self.last_observed == Some(hash) {
            return false;
        }
        self.last_observed = Some(hash);
        true
    }

    pub fn clear(&mut self) {
        self.last_observed = None;
    }
}
