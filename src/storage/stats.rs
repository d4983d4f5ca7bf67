//! Cache statistics.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the cache on every operation. All atomic, relaxed ordering.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    lazy_loads: AtomicU64,
    backing_failures: AtomicU64,
    merged_keys: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`], suitable for logging and the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub lazy_loads: u64,
    pub backing_failures: u64,
    pub merged_keys: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lazy_load(&self) {
        self.lazy_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Backing-store read, write, delete or encoding failure.
    #[inline]
    pub fn record_backing_failure(&self) {
        self.backing_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_merged(&self, count: u64) {
        self.merged_keys.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            lazy_loads: self.lazy_loads.load(Ordering::Relaxed),
            backing_failures: self.backing_failures.load(Ordering::Relaxed),
            merged_keys: self.merged_keys.load(Ordering::Relaxed),
        }
    }
}
