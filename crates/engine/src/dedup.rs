//! Bounded FIFO set of recently processed result files.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Identities of the last processed result files.
pub const DEFAULT_DEDUP_CAPACITY: usize = 400;

/// Remembers the last `capacity` inserted paths; the oldest is evicted
/// first once full.
#[derive(Debug, Clone)]
pub struct DedupCache {
    capacity: usize,
    order: VecDeque<PathBuf>,
    members: HashSet<PathBuf>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.members.contains(path)
    }

    /// Record `path`. Returns `false` if it was already present, in which
    /// case its position is unchanged.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.members.contains(&path) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        self.members.insert(path.clone());
        self.order.push_back(path);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
