use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::models::{Diagram, DiagramCacheStats};

/// DiagramCache
///
/// Process-wide cache of generated diagrams, owned by the application state.
/// Bounded: once `capacity` is reached the oldest insertion is evicted. Re-inserting
/// an existing key replaces the entry and refreshes its position.
pub struct DiagramCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Diagram>,
    // Insertion order, oldest at the front.
    order: VecDeque<String>,
    evictions: u64,
}

pub type DiagramCacheState = Arc<DiagramCache>;

impl DiagramCache {
    /// A zero capacity is clamped to one entry.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Diagram> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, diagram: Diagram) {
        let mut inner = self.inner.lock();
        let key = diagram.key.clone();

        if inner.entries.insert(key.clone(), diagram).is_some() {
            inner.order.retain(|existing| existing != &key);
        }
        inner.order.push_back(key);

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                inner.evictions += 1;
                tracing::debug!(key = %oldest, "diagram evicted from cache");
            }
        }
    }

    pub fn remove(&self, key: &str) -> Option<Diagram> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(key);
        if removed.is_some() {
            inner.order.retain(|existing| existing != key);
        }
        removed
    }

    /// Drops every entry. The eviction counter is kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> DiagramCacheStats {
        let inner = self.inner.lock();
        DiagramCacheStats {
            entries: inner.entries.len(),
            capacity: self.capacity,
            evictions: inner.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn diagram(key: &str) -> Diagram {
        Diagram {
            key: key.to_string(),
            svg: format!("<svg><!-- {key} --></svg>"),
            warnings: vec![],
            stored_by: Uuid::nil(),
            stored_at: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache = DiagramCache::new(2);
        cache.insert(diagram("a"));
        cache.insert(diagram("b"));
        cache.insert(diagram("c"));

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn reinsert_refreshes_position() {
        let cache = DiagramCache::new(2);
        cache.insert(diagram("a"));
        cache.insert(diagram("b"));
        cache.insert(diagram("a"));
        cache.insert(diagram("c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_and_remove() {
        let cache = DiagramCache::new(0);
        assert_eq!(cache.stats().capacity, 1);

        cache.insert(diagram("a"));
        assert_eq!(cache.remove("a").map(|d| d.key), Some("a".to_string()));
        assert!(cache.is_empty());

        cache.insert(diagram("b"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
