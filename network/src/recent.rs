//! Bounded recency cache for propagation de-duplication.
//!
//! Remembers the last `capacity` transaction and block hashes this node has
//! relayed. An item seen again inside that window is not propagated again.

use std::collections::{HashSet, VecDeque};

/// Default capacity: the last 4 096 hashes.
pub const DEFAULT_RECENT_CAPACITY: usize = 4_096;

pub struct RecentlySeen {
    capacity: usize,
    hashes: HashSet<[u8; 32]>,
    order: VecDeque<[u8; 32]>,
}

impl RecentlySeen {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            hashes: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Record `hash`. Returns `true` the first time, `false` while it is still
    /// inside the window.
    pub fn insert(&mut self, hash: [u8; 32]) -> bool {
        if self.hashes.contains(&hash) {
            return false;
        }
        if self.hashes.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.hashes.remove(&old);
            }
        }
        self.hashes.insert(hash);
        self.order.push_back(hash);
        true
    }

    pub fn contains(&self, hash: &[u8; 32]) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl Default for RecentlySeen {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}
