//! Entry Store Module
//!
//! Bounded key to JSON document map with per-entry TTL and LRU eviction.
//! The store keeps no hit/miss counters; that is the manager's job.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{
    CacheEntry, Clock, LruTracker, StoreStats, SystemClock, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};

// == Entry Store ==
#[derive(Debug)]
pub struct EntryStore {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: StoreStats,
    max_keys: usize,
    default_ttl: u64,
    clock: Arc<dyn Clock>,
}

impl EntryStore {
    // == Constructor ==
    /// Creates a store backed by the wall clock.
    ///
    /// # Arguments
    /// * `max_keys` - Maximum number of entries held at once
    /// * `default_ttl` - TTL in seconds used when a write carries none
    pub fn new(max_keys: usize, default_ttl: u64) -> Self {
        Self::with_clock(max_keys, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(max_keys: usize, default_ttl: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: StoreStats::default(),
            max_keys,
            default_ttl,
            clock,
        }
    }

    // == Get ==
    /// Returns the live value for `key`, or `None` if it was never set, was
    /// deleted, or has expired. Expired entries are dropped on the spot.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.remove_entry(key);
            self.stats.expirations += 1;
            return Ok(None);
        }

        self.lru.touch(key);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// A TTL of `None` or `Some(0)` falls back to the store default. When a new
    /// key would exceed `max_keys`, expired entries are swept first and then
    /// the least recently used entry is evicted.
    pub fn set(&mut self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        validate_key(key)?;

        let size = serde_json::to_vec(&value)?.len();
        if size > MAX_VALUE_SIZE {
            return Err(CacheError::ValueTooLarge {
                size,
                max: MAX_VALUE_SIZE,
            });
        }

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_keys {
            self.make_room()?;
        }

        let ttl_seconds = match ttl {
            Some(ttl) if ttl > 0 => ttl,
            _ => self.default_ttl,
        };

        self.remove_entry(key);
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl_seconds, size);
        self.stats.approx_bytes += key.len() + size;
        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);

        Ok(())
    }

    // == Delete ==
    /// Removes `key`. Returns true if an entry existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Keys ==
    /// All stored keys. May include expired entries the sweep has not reached yet.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Flush All ==
    pub fn flush_all(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.approx_bytes = 0;
    }

    // == Sweep Expired ==
    /// Drops every expired entry. Returns how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }

        self.stats.expirations += expired.len() as u64;
        expired.len()
    }

    // == Probe ==
    /// Writes `value` under `key`, reads it back and restores the previous
    /// state. Bypasses the key cap, recency and stats, so it never evicts.
    /// Returns whether the read-back matched.
    pub fn probe(&mut self, key: &str, value: Value) -> Result<bool> {
        validate_key(key)?;
        let size = serde_json::to_vec(&value)?.len();

        let entry = CacheEntry::new(value.clone(), self.clock.now_ms(), 1, size);
        let previous = self.entries.insert(key.to_string(), entry);
        let matched = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.value == value);

        match previous {
            Some(previous) => {
                self.entries.insert(key.to_string(), previous);
            }
            None => {
                self.entries.remove(key);
            }
        }
        Ok(matched)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.entries.len(),
            ..self.stats.clone()
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&mut self) -> Result<()> {
        if self.sweep_expired() > 0 && self.entries.len() < self.max_keys {
            return Ok(());
        }

        match self.lru.evict_oldest() {
            Some(evicted) => {
                if let Some(entry) = self.entries.remove(&evicted) {
                    self.stats.approx_bytes -= evicted.len() + entry.size;
                }
                self.stats.evictions += 1;
                Ok(())
            }
            None => Err(CacheError::CacheFull(format!(
                "store holds {} of {} keys and nothing can be evicted",
                self.entries.len(),
                self.max_keys
            ))),
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.stats.approx_bytes -= key.len() + entry.size;
        Some(entry)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
