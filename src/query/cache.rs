//! Bounded cache for similarity searches.
//!
//! BK-tree walks are the most expensive query path, and interactive sessions
//! repeat them (typo-hunting around the same word). The cache stores raw
//! tree results keyed by `(word, cutoff, exhaustive)` and is cleared on every
//! mutation, so entries can never outlive the tree state they were computed
//! from.

use crate::index::types::WordId;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SimKey {
    word: String,
    max_distance: u32,
    exhaustive: bool,
}

pub struct QueryCache {
    inner: Mutex<LruCache<SimKey, Arc<Vec<(WordId, u32)>>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the cached result for the key, computing and storing it on a
    /// miss. A poisoned lock degrades to computing without caching.
    pub fn get_or_compute<F>(
        &self,
        word: &str,
        max_distance: u32,
        exhaustive: bool,
        compute: F,
    ) -> Arc<Vec<(WordId, u32)>>
    where
        F: FnOnce() -> Vec<(WordId, u32)>,
    {
        let key = SimKey {
            word: word.to_string(),
            max_distance,
            exhaustive,
        };

        if let Ok(mut cache) = self.inner.lock() {
            if let Some(hit) = cache.get(&key) {
                return Arc::clone(hit);
            }
        }

        let value = Arc::new(compute());
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, Arc::clone(&value));
        }
        value
    }

    /// Drop every entry; called after any mutation.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_skips_recompute() {
        let cache = QueryCache::new(8);
        let first = cache.get_or_compute("apple", 2, false, || vec![(1, 0)]);
        let second = cache.get_or_compute("apple", 2, false, || panic!("should be cached"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_key_includes_cutoff_and_mode() {
        let cache = QueryCache::new(8);
        cache.get_or_compute("apple", 1, false, || vec![(1, 0)]);
        let widened = cache.get_or_compute("apple", 2, false, || vec![(1, 0), (2, 2)]);
        assert_eq!(widened.len(), 2);
        let exhaustive = cache.get_or_compute("apple", 2, true, || vec![(9, 1)]);
        assert_eq!(exhaustive.as_ref(), &vec![(9, 1)]);
    }

    #[test]
    fn test_clear_invalidates() {
        let cache = QueryCache::new(8);
        cache.get_or_compute("apple", 2, false, || vec![(1, 0)]);
        cache.clear();
        let recomputed = cache.get_or_compute("apple", 2, false, || vec![(7, 2)]);
        assert_eq!(recomputed.as_ref(), &vec![(7, 2)]);
    }
}
