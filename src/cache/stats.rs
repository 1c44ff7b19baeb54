//! Cache Statistics Module
//!
//! Per-driver retrieval and operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Live counters owned by a single driver.
///
/// Counters only ever increase. Nothing here is global, so two drivers over
/// the same store never see each other's numbers.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_misses: AtomicU64,
    set_oks: AtomicU64,
    set_errors: AtomicU64,
    set_object_errors: AtomicU64,
    get_oks: AtomicU64,
    get_errors: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_miss(&self) {
        self.expired_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set_ok(&self) {
        self.set_oks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set_error(&self) {
        self.set_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set_object_error(&self) {
        self.set_object_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get_ok(&self) {
        self.get_oks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get_error(&self) {
        self.get_errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counter values.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_misses: self.expired_misses.load(Ordering::Relaxed),
            set_oks: self.set_oks.load(Ordering::Relaxed),
            set_errors: self.set_errors.load(Ordering::Relaxed),
            set_object_errors: self.set_object_errors.load(Ordering::Relaxed),
            get_oks: self.get_oks.load(Ordering::Relaxed),
            get_errors: self.get_errors.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Point-in-time copy of a driver's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Gets that returned a live value
    pub hits: u64,
    /// Gets for keys the store did not have
    pub misses: u64,
    /// Gets that found an expired or invalidated entry
    pub expired_misses: u64,
    /// Successful store writes
    pub set_oks: u64,
    /// Failed store writes
    pub set_errors: u64,
    /// Failed busy-lock write-backs
    pub set_object_errors: u64,
    /// Gets that completed without error
    pub get_oks: u64,
    /// Gets that failed in the store or while decoding
    pub get_errors: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses + expired misses), or 0.0 if no lookups
    /// have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.expired_misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
