//! Per-cache counters.
//!
//! Counters are only touched when the cache was configured with
//! `stats_enabled`; reporting them anywhere is left to the caller.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss/write counters for one cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Reads that found a value or an empty marker
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Writes applied (direct or committed)
    pub puts: u64,
    /// Direct evictions requested
    pub evictions: u64,
}

impl StatsSnapshot {
    /// Hit rate in `[0.0, 1.0]`; 0 when nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CacheStats {
    /// Counters that record only when `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    /// Whether counters are recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    fn bump(&self, counter: &AtomicU64, n: u64) {
        if self.enabled {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Record a read outcome.
    #[inline]
    pub fn record_read(&self, hit: bool) {
        if hit {
            self.bump(&self.hits, 1);
        } else {
            self.bump(&self.misses, 1);
        }
    }

    /// Record applied writes.
    #[inline]
    pub fn record_puts(&self, n: u64) {
        self.bump(&self.puts, n);
    }

    /// Record requested evictions.
    #[inline]
    pub fn record_evictions(&self, n: u64) {
        self.bump(&self.evictions, n);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
