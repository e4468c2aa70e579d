//! One-shot cache warming triggered by the first request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::watch;
use tracing::info;

use crate::cache::{CacheManager, DataLoaders, WarmReport};
use crate::tasks::spawn_warm_task;

/// Starts a background warm run the first time it is triggered and ignores
/// every later trigger. Clones share the same flag and report channel.
#[derive(Clone, Debug)]
pub struct StartupWarmer {
    cache: Arc<CacheManager>,
    loaders: DataLoaders,
    started: Arc<AtomicBool>,
    reports: Arc<watch::Sender<Option<WarmReport>>>,
}

impl StartupWarmer {
    pub fn new(cache: Arc<CacheManager>, loaders: DataLoaders) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            cache,
            loaders,
            started: Arc::new(AtomicBool::new(false)),
            reports: Arc::new(reports),
        }
    }

    /// Spawns the warm task unless it already ran. Returns true if this call
    /// started it. Never waits for the task.
    pub fn trigger(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }

        info!(loaders = self.loaders.len(), "first request seen, warming cache in background");
        spawn_warm_task(
            self.cache.clone(),
            self.loaders.clone(),
            self.reports.clone(),
        );
        true
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Receives the report once the background run finishes.
    pub fn subscribe(&self) -> watch::Receiver<Option<WarmReport>> {
        self.reports.subscribe()
    }
}

/// Middleware applied with
/// `middleware::from_fn_with_state(warmer, warm_on_first_request)`.
pub async fn warm_on_first_request(
    State(warmer): State<StartupWarmer>,
    request: Request,
    next: Next,
) -> Response {
    warmer.trigger();
    next.run(request).await
}
