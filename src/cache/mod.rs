//! Cache Module
//!
//! In-process JSON cache: key construction, a TTL-expiring bounded store, and
//! the manager that wraps it with counters and logging.

mod clock;
mod entry;
mod keys;
mod lru;
mod manager;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use keys::{build_key, CacheKey, CacheKeys, EntityKind, KEY_SEPARATOR};
pub use lru::LruTracker;
pub use manager::{
    CacheManager, DataLoaders, HealthReport, Loader, LoaderFuture, WarmFailure, WarmReport,
};
pub use stats::{CacheStats, StatsSnapshot, StoreStats};
pub use store::EntryStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
