//! Cache Entry Module
//!
//! A stored JSON payload plus the metadata needed to expire it.

use serde_json::Value;

// == Cache Entry ==
/// A single stored document.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// When the entry was written (Unix milliseconds)
    pub stored_at: u64,
    /// Lifetime in seconds
    pub ttl_seconds: u64,
    /// Serialized size of `value` in bytes
    pub size: usize,
}

impl CacheEntry {
    pub fn new(value: Value, stored_at: u64, ttl_seconds: u64, size: usize) -> Self {
        Self {
            value,
            stored_at,
            ttl_seconds,
            size,
        }
    }

    // == Is Expired ==
    /// An entry expires once strictly more than `ttl_seconds` have elapsed
    /// since it was stored.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at) > self.ttl_seconds.saturating_mul(1000)
    }

    /// Remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        let expires_at = self
            .stored_at
            .saturating_add(self.ttl_seconds.saturating_mul(1000));
        expires_at.saturating_sub(now_ms)
    }
}
