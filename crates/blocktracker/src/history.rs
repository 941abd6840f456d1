//! Bounded, oldest-first history of the blocks currently believed canonical.

use crate::block::{Block, BlockHash};
use std::collections::VecDeque;

/// Default number of retained blocks.
pub const DEFAULT_CAPACITY: usize = 10;

/// Recently seen blocks, oldest first. Once full, every append evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct History<B> {
    blocks: VecDeque<B>,
    capacity: usize,
}

impl<B: Block> History<B> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            blocks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, block: B) {
        if self.blocks.len() == self.capacity {
            self.blocks.pop_front();
        }
        self.blocks.push_back(block);
    }

    pub fn contains(&self, block: &B) -> bool {
        self.index_of(&block.hash()).is_some()
    }

    pub fn index_of(&self, hash: &BlockHash) -> Option<usize> {
        self.blocks.iter().position(|b| b.hash() == *hash)
    }

    /// Drop every entry after `index`, returning them oldest first.
    pub fn truncate_after(&mut self, index: usize) -> Vec<B> {
        if index + 1 >= self.blocks.len() {
            return Vec::new();
        }
        self.blocks.split_off(index + 1).into()
    }

    pub fn last(&self) -> Option<&B> {
        self.blocks.back()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &B> {
        self.blocks.iter()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
