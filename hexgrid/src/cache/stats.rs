//! Cache counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated on every lookup.
#[derive(Debug, Default)]
pub struct CacheStats {
    requests: AtomicU64,
    negative_hits: AtomicU64,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    producer_fetches: AtomicU64,
    partial_fills: AtomicU64,
    blob_hits: AtomicU64,
    notifications: AtomicU64,
    misses: AtomicU64,
    disk_writes: AtomicU64,
    corrupt_files: AtomicU64,
    invalidations: AtomicU64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl CacheStats {
            $(
                pub(crate) fn $name(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*
        }
    };
}

counter! {
    record_request => requests,
    record_negative_hit => negative_hits,
    record_memory_hit => memory_hits,
    record_disk_hit => disk_hits,
    record_producer_fetch => producer_fetches,
    record_partial_fill => partial_fills,
    record_blob_hit => blob_hits,
    record_notification => notifications,
    record_miss => misses,
    record_disk_write => disk_writes,
    record_corrupt_file => corrupt_files,
    record_invalidation => invalidations,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            requests: load(&self.requests),
            negative_hits: load(&self.negative_hits),
            memory_hits: load(&self.memory_hits),
            disk_hits: load(&self.disk_hits),
            producer_fetches: load(&self.producer_fetches),
            partial_fills: load(&self.partial_fills),
            blob_hits: load(&self.blob_hits),
            notifications: load(&self.notifications),
            misses: load(&self.misses),
            disk_writes: load(&self.disk_writes),
            corrupt_files: load(&self.corrupt_files),
            invalidations: load(&self.invalidations),
        }
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub requests: u64,
    /// Lookups answered by the has-values index or the coverage check.
    pub negative_hits: u64,
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub producer_fetches: u64,
    /// Partial tiles completed from the producer.
    pub partial_fills: u64,
    pub blob_hits: u64,
    pub notifications: u64,
    /// Lookups no source could answer.
    pub misses: u64,
    pub disk_writes: u64,
    pub corrupt_files: u64,
    pub invalidations: u64,
}

impl CacheStatsSnapshot {
    /// Share of requests served from memory or disk.
    pub fn local_hit_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        (self.memory_hits + self.disk_hits) as f64 / self.requests as f64
    }
}

impl fmt::Display for CacheStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests: {} memory, {} disk, {} producer, {} blob, {} notified, {} negative, {} missed",
            self.requests,
            self.memory_hits,
            self.disk_hits,
            self.producer_fetches,
            self.blob_hits,
            self.notifications,
            self.negative_hits,
            self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_snapshot() {
        let stats = CacheStats::default();
        stats.record_request();
        stats.record_request();
        stats.record_memory_hit();
        stats.record_disk_write();

        let snap = stats.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.memory_hits, 1);
        assert_eq!(snap.disk_writes, 1);
        assert!((snap.local_hit_rate() - 0.5).abs() < f64::EPSILON);
        assert!(snap.to_string().starts_with("2 requests"));
    }

    #[test]
    fn test_empty_hit_rate() {
        assert_eq!(CacheStatsSnapshot::default().local_hit_rate(), 0.0);
    }
}
