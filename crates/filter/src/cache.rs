//! Bounded LRU cache of segment filters
//!
//! Entries are keyed by (canonical principal key, segment snapshot key).
//! Segment snapshots never change, so an entry is never invalidated in
//! place; once its segment stops being queried it ages out through LRU.
//!
//! # Capacity
//!
//! Two bounds: `max_entries` and `low_water_mark`. When a put leaves more
//! than `max_entries` entries, least recently used entries are evicted until
//! at most `low_water_mark` remain. Recency is updated by both get and put.
//!
//! # Concurrency
//!
//! The map sits behind one `parking_lot::Mutex` held only for the map
//! operation itself. Builds run outside the lock, so concurrent misses on
//! the same key may both build; the last put wins.

use std::collections::HashSet;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use strata_acl_core::{FilterSettings, PrincipalKey, Result, SegmentKey};
use tracing::debug;

use crate::bitmap::DocBitmap;
use crate::stats::{CacheCounters, CacheStats};

/// Cache key: one principal set against one segment snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey {
    /// Canonical principal set
    pub principals: PrincipalKey,
    /// Segment snapshot the bitmap was built against
    pub segment: SegmentKey,
}

impl FilterKey {
    /// Create a key
    pub fn new(principals: PrincipalKey, segment: SegmentKey) -> Self {
        FilterKey {
            principals,
            segment,
        }
    }
}

/// Bounded store of built segment filters with cumulative statistics.
pub struct FilterCache {
    entries: Mutex<LruCache<FilterKey, Arc<DocBitmap>>>,
    max_entries: usize,
    low_water_mark: usize,
    counters: CacheCounters,
}

impl FilterCache {
    /// Create a cache. `max_entries` is raised to at least 1 and
    /// `low_water_mark` capped at `max_entries`.
    pub fn new(max_entries: usize, low_water_mark: usize) -> Self {
        let max_entries = max_entries.max(1);
        FilterCache {
            entries: Mutex::new(LruCache::unbounded()),
            max_entries,
            low_water_mark: low_water_mark.min(max_entries),
            counters: CacheCounters::default(),
        }
    }

    /// Create a cache with the configured bounds
    pub fn from_settings(settings: &FilterSettings) -> Self {
        Self::new(settings.max_cache_entries, settings.cache_low_water_mark)
    }

    /// Look up a bitmap, marking it most recently used.
    pub fn get(&self, key: &FilterKey) -> Option<Arc<DocBitmap>> {
        let found = self.entries.lock().get(key).cloned();
        if found.is_some() {
            self.counters.record_hit();
        } else {
            self.counters.record_miss();
        }
        found
    }

    /// Insert or replace a bitmap, then run an eviction pass if the cache
    /// is over its upper bound.
    pub fn put(&self, key: FilterKey, bitmap: Arc<DocBitmap>) {
        let non_live = bitmap.is_empty();
        let (evicted, size) = {
            let mut entries = self.entries.lock();
            entries.put(key, bitmap);
            let mut evicted = 0u64;
            if entries.len() > self.max_entries {
                while entries.len() > self.low_water_mark {
                    if entries.pop_lru().is_none() {
                        break;
                    }
                    evicted += 1;
                }
            }
            self.counters.set_size(entries.len());
            (evicted, entries.len())
        };

        self.counters.record_put(non_live);
        self.counters.record_evictions(evicted);
        if evicted > 0 {
            debug!(target: "strata::acl", evicted, size, "Filter cache eviction pass");
        }
    }

    /// Return the cached bitmap for `key`, or run `build` and cache its result.
    ///
    /// `build` runs without any cache lock held. A failed build is returned
    /// as-is and nothing is cached.
    pub fn resolve<F>(&self, key: FilterKey, build: F) -> Result<Arc<DocBitmap>>
    where
        F: FnOnce() -> Result<DocBitmap>,
    {
        if let Some(bitmap) = self.get(&key) {
            return Ok(bitmap);
        }
        let bitmap = Arc::new(build()?);
        self.put(key, Arc::clone(&bitmap));
        Ok(bitmap)
    }

    /// True if `key` is cached. Does not touch recency or statistics.
    pub fn contains(&self, key: &FilterKey) -> bool {
        self.entries.lock().contains(key)
    }

    /// Up to `n` distinct principal keys, most recently used first.
    pub fn recent_principals(&self, n: usize) -> Vec<PrincipalKey> {
        let entries = self.entries.lock();
        let mut seen = HashSet::new();
        let mut recent = Vec::new();
        for (key, _) in entries.iter() {
            if recent.len() >= n {
                break;
            }
            if seen.insert(&key.principals) {
                recent.push(key.principals.clone());
            }
        }
        recent
    }

    /// Drop every entry. Cumulative counters keep their values.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.counters.set_size(0);
    }

    /// Entries currently cached
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper bound that triggers an eviction pass
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Entry count an eviction pass settles at
    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }

    /// Snapshot of the cumulative counters; never takes the map lock.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCache")
            .field("max_entries", &self.max_entries)
            .field("low_water_mark", &self.low_water_mark)
            .field("stats", &self.stats())
            .finish()
    }
}
