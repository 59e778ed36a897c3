//! Bounded LRU of remote-model responses keyed by text fingerprint.
//!
//! Single-process only: the map lives in this instance's memory, with no persistence
//! and no sharing across replicas. Swap for an external store behind the same
//! `get`/`insert` surface if that is ever needed.
//!
//! Each `get`/`insert` is one locked step. Callers must not hold the lock across the
//! network call, so two concurrent misses on one fingerprint may both reach the
//! remote model; the later insert simply refreshes the entry.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use crate::contract::AnalysisResponse;

pub const DEFAULT_CACHE_CAPACITY: usize = 200;

#[derive(Debug)]
pub struct FingerprintCache {
    inner: Mutex<LruCache<String, AnalysisResponse>>,
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl FingerprintCache {
    /// Capacity below 1 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    // A panic elsewhere must not wedge the cache; the map itself stays consistent.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, AnalysisResponse>> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Lookup and promote to most-recently-used. Hit/miss is decided here, atomically.
    pub fn get(&self, key: &str) -> Option<AnalysisResponse> {
        self.lock().get(key).cloned()
    }

    /// Lookup without touching recency.
    pub fn peek(&self, key: &str) -> Option<AnalysisResponse> {
        self.lock().peek(key).cloned()
    }

    /// Insert or refresh. Returns the key evicted to make room, if any.
    pub fn insert(&self, key: String, value: AnalysisResponse) -> Option<String> {
        match self.lock().push(key.clone(), value) {
            Some((old_key, _)) if old_key != key => Some(old_key),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::build_error;

    fn entry(tag: &str) -> AnalysisResponse {
        build_error(tag, "test", tag)
    }

    #[test]
    fn evicts_least_recently_used() {
        let c = FingerprintCache::new(2);
        assert_eq!(c.insert("a".into(), entry("a")), None);
        assert_eq!(c.insert("b".into(), entry("b")), None);
        // touch "a" so "b" becomes the eviction candidate
        assert!(c.get("a").is_some());
        assert_eq!(c.insert("c".into(), entry("c")), Some("b".to_string()));
        assert!(c.peek("b").is_none());
        assert!(c.peek("a").is_some());
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn refreshing_a_key_evicts_nothing() {
        let c = FingerprintCache::new(1);
        c.insert("a".into(), entry("a1"));
        assert_eq!(c.insert("a".into(), entry("a2")), None);
        assert_eq!(c.get("a").unwrap().text, "a2");
    }

    #[test]
    fn zero_capacity_is_raised() {
        assert_eq!(FingerprintCache::new(0).capacity(), 1);
        assert_eq!(FingerprintCache::default().capacity(), DEFAULT_CACHE_CAPACITY);
    }
}
