//! Cache Warming Task
//!
//! Runs the data loaders on a detached task so the request that triggered
//! warming never waits on them.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheManager, DataLoaders, WarmReport};

/// Spawns one warm run and publishes its report on `reports`.
///
/// Loader failures are already isolated and recorded by
/// `CacheManager::warm_cache`; the report is the task's error channel.
pub fn spawn_warm_task(
    cache: Arc<CacheManager>,
    loaders: DataLoaders,
    reports: Arc<watch::Sender<Option<WarmReport>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let report = cache.warm_cache(&loaders).await;
        info!(
            warmed = report.warmed.len(),
            failed = report.failed.len(),
            "background cache warming done"
        );
        reports.send_replace(Some(report));
    })
}
