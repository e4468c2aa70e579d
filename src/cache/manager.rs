//! Cache Manager Module
//!
//! Front door to the entry store. Every operation is counted and logged, and
//! store faults are absorbed here: callers see a miss or a `false`, never an
//! error.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStats, EntityKind, EntryStore, StatsSnapshot};
use crate::config::{Config, TtlConfig};

/// Future produced by a data loader.
pub type LoaderFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

/// Async producer of the full listing for one entity kind.
pub type Loader = Arc<dyn Fn() -> LoaderFuture + Send + Sync>;

// == Data Loaders ==
/// Named loaders used to warm the cache, one per entity kind.
#[derive(Clone, Default)]
pub struct DataLoaders {
    loaders: BTreeMap<EntityKind, Loader>,
}

impl DataLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the loader for `kind`, replacing any previous one.
    pub fn with<F, Fut>(mut self, kind: EntityKind, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.loaders
            .insert(kind, Arc::new(move || Box::pin(loader()) as LoaderFuture));
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.loaders.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl fmt::Debug for DataLoaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.loaders.keys()).finish()
    }
}

/// A loader that failed during warming.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmFailure {
    pub kind: EntityKind,
    pub error: String,
}

/// Outcome of a warm run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarmReport {
    pub warmed: Vec<EntityKind>,
    pub failed: Vec<WarmFailure>,
}

/// Result of the store probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store: bool,
    pub overall: bool,
}

struct Inner {
    store: EntryStore,
    stats: CacheStats,
    /// Bumped by every delete, invalidation and clear
    epoch: u64,
}

impl Inner {
    fn set(&mut self, key: &str, value: Value, ttl: u64) -> bool {
        match self.store.set(key, value, Some(ttl)) {
            Ok(()) => {
                self.stats.record_set();
                debug!(key, ttl, "cache set");
                true
            }
            Err(err) => {
                self.stats.record_error();
                warn!(key, error = %err, "cache set failed");
                false
            }
        }
    }
}

// == Cache Manager ==
pub struct CacheManager {
    inner: RwLock<Inner>,
    ttl: TtlConfig,
}

impl CacheManager {
    pub fn new(store: EntryStore, ttl: TtlConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                store,
                stats: CacheStats::new(),
                epoch: 0,
            }),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EntryStore::new(config.max_keys, config.default_ttl),
            config.ttl.clone(),
        )
    }

    pub fn ttl(&self) -> &TtlConfig {
        &self.ttl
    }

    // == Get ==
    /// Looks up `key`, counting a hit or a miss. Faults count as errors and
    /// read as a miss.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.write().await;
        match inner.store.get(key) {
            Ok(Some(value)) => {
                inner.stats.record_hit();
                debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                inner.stats.record_miss();
                debug!(key, "cache miss");
                None
            }
            Err(err) => {
                inner.stats.record_error();
                warn!(key, error = %err, "cache get failed");
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` for `ttl` seconds (0 uses the store default).
    /// Returns false if the store refused the write.
    pub async fn set(&self, key: &str, value: Value, ttl: u64) -> bool {
        self.inner.write().await.set(key, value, ttl)
    }

    /// Current invalidation epoch. Read it before loading a value that will
    /// be stored with `set_unless_invalidated`.
    pub async fn invalidation_epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Like `set`, but stores nothing if any delete, invalidation or clear
    /// happened since `epoch` was read. The loaded value may predate that
    /// write, so caching it would serve stale data until its TTL ran out.
    pub async fn set_unless_invalidated(
        &self,
        key: &str,
        value: Value,
        ttl: u64,
        epoch: u64,
    ) -> bool {
        let mut inner = self.inner.write().await;
        if inner.epoch != epoch {
            debug!(key, "invalidated while loading, not storing");
            return false;
        }
        inner.set(key, value, ttl)
    }

    // == Delete ==
    /// Removes `key`. Safe to repeat; returns whether something was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.write().await;
        let existed = inner.store.delete(key);
        inner.stats.record_delete();
        inner.epoch += 1;
        debug!(key, existed, "cache delete");
        existed
    }

    // == Invalidate Pattern ==
    /// Deletes every key containing `pattern` anywhere in it, so
    /// `"projects"` clears `projects:all`, `projects:id:42` and suffixed
    /// variants in one call. Returns the number of keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;
        let matching: Vec<String> = inner
            .store
            .keys()
            .into_iter()
            .filter(|key| key.contains(pattern))
            .collect();

        let deleted = matching
            .iter()
            .filter(|key| inner.store.delete(key))
            .count();

        info!(pattern, deleted, "cache invalidate");
        deleted
    }

    // == Clear ==
    pub async fn clear(&self) -> bool {
        let mut inner = self.inner.write().await;
        inner.store.flush_all();
        inner.epoch += 1;
        info!("cache cleared");
        true
    }

    // == Stats ==
    pub async fn stats(&self) -> StatsSnapshot {
        let inner = self.inner.read().await;
        StatsSnapshot::new(&inner.stats, inner.store.stats())
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.read().await.store.keys()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.store.is_empty()
    }

    /// Drops expired entries; driven by the background sweep task.
    pub async fn sweep_expired(&self) -> usize {
        self.inner.write().await.store.sweep_expired()
    }

    // == Get Or Load ==
    /// Read-through for route handlers: returns the cached value, or runs
    /// `loader`, stores its output and returns it. Loader errors are passed
    /// back unchanged and nothing is stored.
    pub async fn get_or_load<F, Fut>(&self, key: &str, ttl: u64, loader: F) -> anyhow::Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = loader().await?;
        self.set(key, value.clone(), ttl).await;
        Ok(value)
    }

    // == Warm Cache ==
    /// Runs every loader in its own task and stores each result under the
    /// kind's `all` key with the kind's TTL. A loader that errors or panics
    /// is reported in `failed` and does not affect the others.
    pub async fn warm_cache(&self, loaders: &DataLoaders) -> WarmReport {
        info!(loaders = loaders.len(), "starting cache warming");

        let handles: Vec<_> = loaders
            .loaders
            .iter()
            .map(|(kind, loader)| (*kind, tokio::spawn(loader())))
            .collect();

        let mut report = WarmReport::default();
        for (kind, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(err.to_string()),
                Err(join_err) => Err(format!("loader task failed: {}", join_err)),
            };

            match outcome {
                Ok(value) => {
                    let key = kind.all_key();
                    if self.set(key.as_str(), value, self.ttl.for_kind(kind)).await {
                        report.warmed.push(kind);
                    } else {
                        report.failed.push(WarmFailure {
                            kind,
                            error: format!("could not store {}", key),
                        });
                    }
                }
                Err(error) => {
                    error!(kind = %kind, error = %error, "cache warming failed for loader");
                    report.failed.push(WarmFailure { kind, error });
                }
            }
        }

        info!(
            warmed = report.warmed.len(),
            failed = report.failed.len(),
            "cache warming finished"
        );
        report
    }

    // == Health Check ==
    /// Round-trips a throwaway `health_check_<millis>` key through the
    /// store. The probe never evicts entries and does not touch the counters.
    pub async fn health_check(&self) -> HealthReport {
        let mut inner = self.inner.write().await;
        let probe = format!("health_check_{}", inner.store.now_ms());

        let store_ok = match inner.store.probe(&probe, json!("test")) {
            Ok(matched) => matched,
            Err(err) => {
                error!(error = %err, "cache health check failed");
                false
            }
        };

        HealthReport {
            store: store_ok,
            overall: store_ok,
        }
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
