//! Cache Statistics Module
//!
//! Process-lifetime counters kept by the cache manager, plus the store-level
//! figures reported next to them.

use serde::Serialize;

// == Cache Stats ==
/// Counters for manager operations. They only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// hits / (hits + misses), or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }
}

// == Store Stats ==
/// What the entry store itself knows about its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Entries currently held, including expired ones not yet swept
    pub keys: usize,
    /// Entries dropped to stay under `max_keys`
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Total serialized size of keys and values
    pub approx_bytes: usize,
}

// == Stats Snapshot ==
/// Point-in-time view returned by `CacheManager::stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
    pub hit_rate: f64,
    pub store: StoreStats,
}

impl StatsSnapshot {
    pub fn new(counters: &CacheStats, store: StoreStats) -> Self {
        Self {
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            deletes: counters.deletes,
            errors: counters.errors,
            hit_rate: counters.hit_rate(),
            store,
        }
    }
}
