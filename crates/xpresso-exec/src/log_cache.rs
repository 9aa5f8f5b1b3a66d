//! Bounded store of recent operation reports.
//!
//! Holds the latest report per operation category ("build", "test", ...).
//! Ordering is by first insertion: overwriting a key updates its content but
//! keeps its position, so eviction always drops the key that was inserted
//! earliest among those present.

use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::debug;

/// Thread-safe, fixed-capacity log cache.
#[derive(Debug)]
pub struct LogCache {
    capacity: usize,
    entries: RwLock<IndexMap<String, String>>,
}

impl Default for LogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LogCache {
    /// Number of entries kept by [`LogCache::new`].
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(IndexMap::with_capacity(capacity + 1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or overwrite the report stored under `key`.
    pub fn store(&self, key: impl Into<String>, content: impl Into<String>) {
        let key = key.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        // IndexMap::insert keeps the existing slot for a known key.
        entries.insert(key, content.into());

        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                debug!(key = %evicted, "evicted oldest log entry");
            }
        }
    }

    /// Look up a report.
    ///
    /// With a key, returns that key's content. Without one, returns the
    /// content of the most recently inserted key.
    pub fn retrieve(&self, key: Option<&str>) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match key {
            Some(key) => entries.get(key).cloned(),
            None => entries.last().map(|(_, content)| content.clone()),
        }
    }

    /// All keys in insertion order.
    pub fn list_keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_store_and_retrieve() {
        let cache = LogCache::new();
        cache.store("build", "text");
        assert_eq!(cache.retrieve(Some("build")), Some("text".to_string()));
    }

    #[test]
    fn test_retrieve_on_empty_cache() {
        let cache = LogCache::new();
        assert_eq!(cache.retrieve(Some("x")), None);
        assert_eq!(cache.retrieve(None), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_retrieve_unknown_key() {
        let cache = LogCache::new();
        cache.store("build", "ok");
        assert_eq!(cache.retrieve(Some("x")), None);
    }

    #[test]
    fn test_retrieve_without_key_returns_last_inserted() {
        let cache = LogCache::new();
        cache.store("a", "A");
        cache.store("b", "B");
        cache.store("c", "C");
        assert_eq!(cache.retrieve(None), Some("C".to_string()));
    }

    #[test]
    fn test_overwrite_keeps_first_insertion_position() {
        let cache = LogCache::new();
        cache.store("build", "OK1");
        cache.store("test", "OK2");
        cache.store("build", "OK3");

        assert_eq!(cache.list_keys(), vec!["build", "test"]);
        assert_eq!(cache.retrieve(Some("build")), Some("OK3".to_string()));
        // "test" is still the last inserted key
        assert_eq!(cache.retrieve(None), Some("OK2".to_string()));
    }

    #[test]
    fn test_eleventh_key_evicts_first() {
        let cache = LogCache::new();
        for i in 0..11 {
            cache.store(format!("op{}", i), format!("log {}", i));
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.retrieve(Some("op0")), None);
        for i in 1..11 {
            assert_eq!(
                cache.retrieve(Some(&format!("op{}", i))),
                Some(format!("log {}", i))
            );
        }
    }

    #[test]
    fn test_eviction_ignores_rewrites() {
        let cache = LogCache::new();
        for i in 0..10 {
            cache.store(format!("op{}", i), "first");
        }
        // Rewriting op0 does not refresh it.
        cache.store("op0", "second");
        cache.store("op10", "new");

        assert_eq!(cache.retrieve(Some("op0")), None);
        assert_eq!(cache.list_keys().first().map(String::as_str), Some("op1"));
        assert_eq!(cache.list_keys().last().map(String::as_str), Some("op10"));
    }

    #[test]
    fn test_custom_capacity() {
        let cache = LogCache::with_capacity(2);
        cache.store("a", "1");
        cache.store("b", "2");
        cache.store("c", "3");
        assert_eq!(cache.list_keys(), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = LogCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
        cache.store("a", "1");
        cache.store("b", "2");
        assert_eq!(cache.list_keys(), vec!["b"]);
    }

    #[test]
    fn test_concurrent_stores_respect_capacity() {
        let cache = Arc::new(LogCache::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..50 {
                        cache.store(format!("t{}-{}", t, i), "x");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 10);
    }
}
