//! Cumulative filter cache statistics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Lock-free counters behind [`CacheStats`].
///
/// Lookups are not stored; they are derived as hits + misses so every
/// snapshot satisfies `lookups == hits + misses` even mid-update.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    non_live_puts: AtomicU64,
    evictions: AtomicU64,
    size: AtomicUsize,
}

impl CacheCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self, non_live: bool) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        if non_live {
            self.non_live_puts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn set_size(&self, size: usize) {
        self.size.store(size, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            lookups: hits + misses,
            hits,
            misses,
            puts: self.puts.load(Ordering::Relaxed),
            non_live_puts: self.non_live_puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the cache counters.
///
/// Every counter is cumulative over the life of the process; `size` is the
/// current entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// get() calls
    #[serde(rename = "cumulative_lookups")]
    pub lookups: u64,
    /// get() calls that found an entry
    #[serde(rename = "cumulative_hits")]
    pub hits: u64,
    /// get() calls that found nothing
    #[serde(rename = "cumulative_misses")]
    pub misses: u64,
    /// put() calls
    #[serde(rename = "cumulative_puts")]
    pub puts: u64,
    /// put() calls whose bitmap had no readable document
    #[serde(rename = "cumulative_nonlive_puts")]
    pub non_live_puts: u64,
    /// Entries removed by eviction passes
    #[serde(rename = "cumulative_evictions")]
    pub evictions: u64,
    /// Entries currently cached
    pub size: usize,
}

impl CacheStats {
    /// hits / lookups, or 0.0 before the first lookup
    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}
