//! Write-invalidation for mutating routes.
//!
//! After a POST/PUT/PATCH/DELETE handler returns a 2xx status, every cache
//! key containing one of the configured patterns is purged. Failed writes
//! leave the cache alone.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use crate::cache::{CacheManager, EntityKind};

/// Derives the patterns to purge from the request.
pub type PatternFn = Arc<dyn Fn(&Request) -> Vec<String> + Send + Sync>;

#[derive(Clone)]
pub enum PatternSource {
    Static(Vec<String>),
    Derived(PatternFn),
}

impl PatternSource {
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&Request) -> Vec<String> + Send + Sync + 'static,
    {
        PatternSource::Derived(Arc::new(f))
    }

    pub fn resolve(&self, request: &Request) -> Vec<String> {
        match self {
            PatternSource::Static(patterns) => patterns.clone(),
            PatternSource::Derived(f) => f(request),
        }
    }
}

impl From<&str> for PatternSource {
    fn from(pattern: &str) -> Self {
        PatternSource::Static(vec![pattern.to_string()])
    }
}

impl From<Vec<&str>> for PatternSource {
    fn from(patterns: Vec<&str>) -> Self {
        PatternSource::Static(patterns.into_iter().map(String::from).collect())
    }
}

impl From<EntityKind> for PatternSource {
    fn from(kind: EntityKind) -> Self {
        PatternSource::from(kind.as_str())
    }
}

impl fmt::Debug for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSource::Static(patterns) => f.debug_tuple("Static").field(patterns).finish(),
            PatternSource::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Per-route invalidation settings.
#[derive(Clone, Debug)]
pub struct InvalidateOnWrite {
    pub cache: Arc<CacheManager>,
    pub patterns: PatternSource,
}

impl InvalidateOnWrite {
    pub fn new(cache: Arc<CacheManager>, patterns: impl Into<PatternSource>) -> Self {
        Self {
            cache,
            patterns: patterns.into(),
        }
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Middleware for write-invalidation, applied with
/// `middleware::from_fn_with_state(rule, invalidate_on_write)`.
///
/// Invalidation finishes before the response is handed back.
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn invalidate_on_write(
    State(rule): State<InvalidateOnWrite>,
    request: Request,
    next: Next,
) -> Response {
    if !is_mutating(request.method()) {
        return next.run(request).await;
    }

    let patterns = rule.patterns.resolve(&request);
    let response = next.run(request).await;

    if !response.status().is_success() {
        debug!(status = %response.status(), "write failed, keeping cache");
        return response;
    }

    for pattern in &patterns {
        rule.cache.invalidate_pattern(pattern).await;
    }

    response
}
