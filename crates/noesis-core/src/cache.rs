//! Bounded LRU cache of loaded nodes
//!
//! A capacity fixed at construction, eviction of the least-recently-used
//! entry on overflow, with interior mutability via a mutex so the cache can
//! sit behind a shared service handle.

use crate::node::OntologicalNode;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// A bounded, thread-safe cache from node id to loaded [`OntologicalNode`].
pub struct NodeCache {
    inner: Mutex<LruCache<String, OntologicalNode>>,
}

impl NodeCache {
    /// Build a cache holding at most `capacity` nodes. `capacity` of zero is
    /// coerced up to one: a cache cannot usefully hold nothing.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero"));
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    /// Fetch a node, marking it most-recently-used.
    pub fn get(&self, id: &str) -> Option<OntologicalNode> {
        self.inner.lock().expect("node cache lock poisoned").get(id).cloned()
    }

    /// Insert or refresh a node, evicting the least-recently-used entry if
    /// the cache is at capacity.
    pub fn put(&self, node: OntologicalNode) {
        self.inner.lock().expect("node cache lock poisoned").put(node.id().to_string(), node);
    }

    /// Drop a node from the cache, if present.
    pub fn invalidate(&self, id: &str) {
        self.inner.lock().expect("node cache lock poisoned").pop(id);
    }

    /// Nodes currently cached whose label contains `substring`
    /// (case-insensitive), up to `limit`. Does not touch recency order.
    pub fn find_by_label(&self, substring: &str, limit: usize) -> Vec<OntologicalNode> {
        let needle = substring.to_lowercase();
        self.inner
            .lock()
            .expect("node cache lock poisoned")
            .iter()
            .filter(|(_, node)| node.label().to_lowercase().contains(&needle))
            .take(limit)
            .map(|(_, node)| node.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("node cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
