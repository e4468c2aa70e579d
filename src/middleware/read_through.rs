//! Read-through response cache for GET routes.
//!
//! On a hit the cached document is served without running the handler. On a
//! miss the handler runs, its JSON body is buffered and stored, and the
//! response goes out with cache headers attached. Both paths send the same
//! canonical serialization, so a hit is byte-identical to the miss before it.
//! Cache trouble of any kind falls back to the uncached response.
//!
//! A miss that overlaps a write's invalidation is not stored: the handler may
//! have read data the write has since replaced.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, IF_NONE_MATCH},
        HeaderMap, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::etag::{
    apply_cache_headers, encode_payload, exceeds_limit, if_none_match_matches, is_json,
    json_response, not_modified, CacheStatus,
};
use crate::cache::{CacheKey, CacheManager, MAX_VALUE_SIZE};
use crate::error::ApiError;

/// Derives a key from the request. `None` means "do not cache this one".
pub type KeyFn = Arc<dyn Fn(&Request) -> Option<CacheKey> + Send + Sync>;

/// Where a route's cache key comes from.
#[derive(Clone)]
pub enum KeySource {
    Static(CacheKey),
    Derived(KeyFn),
}

impl KeySource {
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&Request) -> Option<CacheKey> + Send + Sync + 'static,
    {
        KeySource::Derived(Arc::new(f))
    }

    pub fn resolve(&self, request: &Request) -> Option<CacheKey> {
        match self {
            KeySource::Static(key) => Some(key.clone()),
            KeySource::Derived(f) => f(request),
        }
    }
}

impl From<CacheKey> for KeySource {
    fn from(key: CacheKey) -> Self {
        KeySource::Static(key)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeySource::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Per-route read-through settings.
#[derive(Clone, Debug)]
pub struct ReadThrough {
    pub cache: Arc<CacheManager>,
    pub key: KeySource,
    pub ttl: u64,
}

impl ReadThrough {
    pub fn new(cache: Arc<CacheManager>, key: impl Into<KeySource>, ttl: u64) -> Self {
        Self {
            cache,
            key: key.into(),
            ttl,
        }
    }
}

/// Middleware for read-through caching, applied with
/// `middleware::from_fn_with_state(rule, read_through)`.
///
/// Only `200 OK` JSON responses are stored.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn read_through(
    State(rule): State<ReadThrough>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let Some(key) = rule.key.resolve(&request) else {
        return next.run(request).await;
    };
    let if_none_match = request.headers().get(IF_NONE_MATCH).cloned();

    if let Some(cached) = rule.cache.get(key.as_str()).await {
        match encode_payload(&cached) {
            Ok((body, etag)) => {
                debug!(key = %key, outcome = "hit", "serving cached response");
                let mut headers = HeaderMap::new();
                apply_cache_headers(&mut headers, CacheStatus::Hit, &key, rule.ttl, &etag);

                if if_none_match_matches(if_none_match.as_ref(), &etag) {
                    return not_modified(headers);
                }
                return json_response(body, headers);
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cached value not encodable, running handler");
            }
        }
    }

    let epoch = rule.cache.invalidation_epoch().await;
    let response = next.run(request).await;
    if response.status() != StatusCode::OK || !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    if exceeds_limit(&parts.headers, &body, MAX_VALUE_SIZE) {
        debug!(key = %key, "handler response too large to cache");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_VALUE_SIZE).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(key = %key, error = %err, "failed to buffer handler response");
            return ApiError::Internal("failed to read response body".to_string())
                .into_response();
        }
    };

    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            warn!(key = %key, error = %err, "handler body is not valid JSON, not caching");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    let (canonical, etag) = match encode_payload(&value) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(key = %key, error = %err, "could not fingerprint handler body, not caching");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    if rule
        .cache
        .set_unless_invalidated(key.as_str(), value, rule.ttl, epoch)
        .await
    {
        debug!(key = %key, outcome = "miss", ttl = rule.ttl, "stored handler response");
    }

    apply_cache_headers(&mut parts.headers, CacheStatus::Miss, &key, rule.ttl, &etag);
    if if_none_match_matches(if_none_match.as_ref(), &etag) {
        return not_modified(parts.headers);
    }

    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKeys, EntryStore};
    use crate::config::TtlConfig;
    use crate::middleware::{compute_etag, X_CACHE};
    use axum::{
        http::{
            header::{CONTENT_TYPE, ETAG},
            Request as HttpRequest,
        },
        middleware,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn cache() -> Arc<CacheManager> {
        Arc::new(CacheManager::new(
            EntryStore::new(100, 300),
            TtlConfig::default(),
        ))
    }

    fn counting_app(cache: Arc<CacheManager>, calls: Arc<AtomicUsize>) -> Router {
        let rule = ReadThrough::new(cache, CacheKeys::all_projects(), 300);
        Router::new()
            .route(
                "/projects",
                get(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Json(json!([{"title": "Clean water", "id": "1"}]))
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(rule, read_through))
    }

    fn get_request(uri: &str) -> Request {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_miss_then_hit_runs_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(cache(), calls.clone());

        let first = app.clone().oneshot(get_request("/projects")).await.unwrap();
        assert_eq!(first.headers()[X_CACHE], "MISS");
        let first_body = to_bytes(first.into_body(), usize::MAX).await.unwrap();

        let second = app.oneshot(get_request("/projects")).await.unwrap();
        assert_eq!(second.headers()[X_CACHE], "HIT");
        let second_body = to_bytes(second.into_body(), usize::MAX).await.unwrap();

        assert_eq!(first_body, second_body);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loose_json_is_sent_canonical() {
        let rule = ReadThrough::new(cache(), CacheKey::new("donations:all"), 60);
        let app = Router::new()
            .route(
                "/donations",
                get(|| async {
                    (
                        [(CONTENT_TYPE, "application/json")],
                        r#"{ "amount": 1e2 }"#,
                    )
                }),
            )
            .route_layer(middleware::from_fn_with_state(rule, read_through));

        let miss = app.clone().oneshot(get_request("/donations")).await.unwrap();
        let miss_etag = miss.headers()[ETAG].to_str().unwrap().to_string();
        let miss_body = to_bytes(miss.into_body(), usize::MAX).await.unwrap();

        let hit = app.oneshot(get_request("/donations")).await.unwrap();
        assert_eq!(hit.headers()[X_CACHE], "HIT");
        let hit_body = to_bytes(hit.into_body(), usize::MAX).await.unwrap();

        assert_eq!(miss_body, hit_body);
        assert_eq!(&miss_body[..], br#"{"amount":100.0}"#);
        assert_eq!(miss_etag, compute_etag(&miss_body));
    }

    #[tokio::test]
    async fn test_oversized_response_passes_through_uncached() {
        let cache = cache();
        let rule = ReadThrough::new(cache.clone(), CacheKey::new("gallery:all"), 60);
        let app = Router::new()
            .route(
                "/gallery",
                get(|| async {
                    let big = format!("[\"{}\"]", "x".repeat(MAX_VALUE_SIZE));
                    ([(CONTENT_TYPE, "application/json")], big)
                }),
            )
            .route_layer(middleware::from_fn_with_state(rule, read_through));

        let response = app.oneshot(get_request("/gallery")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(X_CACHE).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), MAX_VALUE_SIZE + 4);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_during_miss_prevents_store() {
        let cache = cache();
        let rule = ReadThrough::new(cache.clone(), CacheKeys::all_projects(), 300);
        let writer = cache.clone();
        let app = Router::new()
            .route(
                "/projects",
                get(move || {
                    let writer = writer.clone();
                    async move {
                        // A concurrent write lands while this handler reads.
                        writer.invalidate_pattern("projects").await;
                        Json(json!([{"id": "1"}]))
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(rule, read_through));

        let response = app.oneshot(get_request("/projects")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_CACHE], "MISS");
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_error_responses_are_not_stored() {
        let cache = cache();
        let rule = ReadThrough::new(cache.clone(), CacheKeys::project_by_id("9"), 300);
        let app = Router::new()
            .route(
                "/projects/9",
                get(|| async { (StatusCode::NOT_FOUND, Json(json!({"message": "gone"}))) }),
            )
            .route_layer(middleware::from_fn_with_state(rule, read_through));

        let response = app.oneshot(get_request("/projects/9")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(X_CACHE).is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_json_responses_pass_through() {
        let cache = cache();
        let rule = ReadThrough::new(cache.clone(), CacheKey::new("page:home"), 60);
        let app = Router::new()
            .route("/", get(|| async { "plain text" }))
            .route_layer(middleware::from_fn_with_state(rule, read_through));

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_derived_key_none_skips_cache() {
        let cache = cache();
        let rule = ReadThrough::new(cache.clone(), KeySource::derived(|_| None), 60);
        let app = Router::new()
            .route("/projects", get(|| async { Json(json!([])) }))
            .route_layer(middleware::from_fn_with_state(rule, read_through));

        let response = app.oneshot(get_request("/projects")).await.unwrap();

        assert!(response.headers().get(X_CACHE).is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_if_none_match_on_hit_returns_304() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(cache(), calls);

        let first = app.clone().oneshot(get_request("/projects")).await.unwrap();
        let etag = first.headers()[ETAG].clone();

        let request = HttpRequest::builder()
            .uri("/projects")
            .header(IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let second = app.oneshot(request).await.unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        let body = to_bytes(second.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
