//! Cache Admin Handlers
//!
//! Handlers for the `/api/cache` surface plus the shared application state.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::cache::{CacheManager, DataLoaders};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::middleware::StartupWarmer;
use crate::models::{
    ClearResponse, HealthResponse, InfoResponse, InvalidateResponse, StatsResponse, WarmResponse,
};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
    pub catalog: Arc<Catalog>,
    /// Loaders used by `POST /api/cache/warm` and the startup warmer
    pub loaders: DataLoaders,
    /// Present when warming on the first request is enabled
    pub warmer: Option<StartupWarmer>,
}

impl AppState {
    /// Creates state with a startup warmer over the catalog's loaders.
    pub fn new(cache: Arc<CacheManager>, catalog: Arc<Catalog>) -> Self {
        let loaders = catalog.loaders();
        let warmer = StartupWarmer::new(cache.clone(), loaders.clone());
        Self {
            cache,
            catalog,
            loaders,
            warmer: Some(warmer),
        }
    }

    /// Drops the startup warmer; the cache fills only through requests and
    /// explicit warm calls.
    pub fn without_warmer(mut self) -> Self {
        self.warmer = None;
        self
    }

    /// Builds the cache from configuration over the seeded demo catalog.
    pub fn from_config(config: &Config) -> Self {
        let state = Self::new(
            Arc::new(CacheManager::from_config(config)),
            Arc::new(Catalog::seeded()),
        );
        if config.warm_on_first_request {
            state
        } else {
            state.without_warmer()
        }
    }
}

/// Handler for GET /api/cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.cache.stats().await))
}

/// Handler for GET /api/cache/health
///
/// Responds 503 when the store probe fails.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = state.cache.health_check().await;
    let status = if health.overall {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthResponse::new(health)))
}

/// Handler for DELETE /api/cache/clear
pub async fn clear_handler(State(state): State<AppState>) -> (StatusCode, Json<ClearResponse>) {
    let success = state.cache.clear().await;
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ClearResponse::new(success)))
}

/// Handler for DELETE /api/cache/invalidate/:pattern
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Json<InvalidateResponse> {
    let deleted = state.cache.invalidate_pattern(&pattern).await;
    info!(pattern = %pattern, deleted, "manual invalidation");
    Json(InvalidateResponse::new(pattern, deleted))
}

/// Handler for POST /api/cache/warm
///
/// Runs every loader and waits for the outcome.
pub async fn warm_handler(State(state): State<AppState>) -> Json<WarmResponse> {
    let report = state.cache.warm_cache(&state.loaders).await;
    Json(WarmResponse::new(report))
}

/// Handler for GET /api/cache/info
pub async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse::in_memory())
}
