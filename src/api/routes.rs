//! API Routes
//!
//! Configures the Axum router: cached catalog routes per entity kind and the
//! cache admin surface.

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::catalog::{
    by_category_handler, create_handler, delete_handler, get_handler, list_handler,
    update_handler,
};
use super::handlers::{
    clear_handler, health_handler, info_handler, invalidate_handler, stats_handler, warm_handler,
    AppState,
};
use crate::cache::{CacheKeys, CacheManager, EntityKind};
use crate::middleware::{
    conditional_get, invalidate_on_write, read_through, warm_on_first_request, InvalidateOnWrite,
    KeySource, PatternSource, ReadThrough,
};

/// Final non-empty path segment, e.g. the `:id` of `/api/projects/42`.
fn last_segment(request: &Request) -> Option<String> {
    request
        .uri()
        .path()
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(String::from)
}

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Read-through caching on catalog GET routes, keyed per route
/// - Invalidation of the kind's namespace after successful writes
/// - Conditional GET (ETag / 304) on every JSON response
/// - Background cache warming on the first request, when enabled
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new().nest("/api/cache", admin_routes());
    for kind in EntityKind::ALL {
        router = router.nest(
            &format!("/api/{}", kind),
            catalog_routes(&state.cache, kind),
        );
    }

    router = router.layer(middleware::from_fn(conditional_get));
    if let Some(warmer) = state.warmer.clone() {
        router = router.layer(middleware::from_fn_with_state(warmer, warm_on_first_request));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/clear", delete(clear_handler))
        .route("/invalidate/:pattern", delete(invalidate_handler))
        .route("/warm", post(warm_handler))
        .route("/info", get(info_handler))
}

/// Suffix for listings that carry denormalized counts.
const WITH_COUNTS: &str = "with-counts";

fn wants_counts(request: &Request) -> bool {
    request
        .uri()
        .query()
        .is_some_and(|query| query.split('&').any(|pair| pair == "counts=true"))
}

/// Patterns purged after a successful write to `kind`.
///
/// Project writes also change category counts.
fn invalidation_patterns(kind: EntityKind) -> Vec<String> {
    match kind {
        EntityKind::Projects => vec![kind.as_str().to_string(), format!(":{}", WITH_COUNTS)],
        _ => vec![kind.as_str().to_string()],
    }
}

/// Routes for one entity kind.
///
/// Categories are addressed by keyword and have no by-category listing.
fn catalog_routes(cache: &Arc<CacheManager>, kind: EntityKind) -> Router<AppState> {
    let ttl = cache.ttl();
    let listing = ReadThrough::new(
        cache.clone(),
        KeySource::derived(move |req| {
            let key = kind.all_key();
            if kind == EntityKind::Categories && wants_counts(req) {
                Some(key.with_suffix(WITH_COUNTS))
            } else {
                Some(key)
            }
        }),
        ttl.for_kind(kind),
    );
    let item = ReadThrough::new(
        cache.clone(),
        KeySource::derived(move |req| last_segment(req).map(|id| CacheKeys::item(kind, &id))),
        ttl.for_item(kind),
    );

    let mut router = Router::new()
        .route(
            "/",
            get(list_handler)
                .post(create_handler)
                .route_layer(middleware::from_fn_with_state(listing, read_through)),
        )
        .route(
            "/:id",
            get(get_handler)
                .put(update_handler)
                .patch(update_handler)
                .delete(delete_handler)
                .route_layer(middleware::from_fn_with_state(item, read_through)),
        );

    if kind != EntityKind::Categories {
        let by_category = ReadThrough::new(
            cache.clone(),
            KeySource::derived(move |req| {
                last_segment(req).map(|category| CacheKeys::by_category(kind, &category))
            }),
            ttl.for_category(kind),
        );
        router = router.route(
            "/category/:category",
            get(by_category_handler)
                .route_layer(middleware::from_fn_with_state(by_category, read_through)),
        );
    }

    router
        .route_layer(middleware::from_fn_with_state(
            InvalidateOnWrite::new(
                cache.clone(),
                PatternSource::Static(invalidation_patterns(kind)),
            ),
            invalidate_on_write,
        ))
        .layer(Extension(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryStore;
    use crate::catalog::Catalog;
    use crate::config::TtlConfig;
    use crate::middleware::X_CACHE;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
    };
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let cache = Arc::new(CacheManager::new(
            EntryStore::new(100, 300),
            TtlConfig::default(),
        ));
        AppState::new(cache, Arc::new(Catalog::seeded())).without_warmer()
    }

    fn get_request(uri: &str) -> Request {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment(&get_request("/42")), Some("42".to_string()));
        assert_eq!(
            last_segment(&get_request("/category/health")),
            Some("health".to_string())
        );
        assert_eq!(last_segment(&get_request("/")), None);
    }

    #[test]
    fn test_wants_counts() {
        assert!(wants_counts(&get_request("/?counts=true")));
        assert!(wants_counts(&get_request("/?page=2&counts=true")));
        assert!(!wants_counts(&get_request("/?counts=false")));
        assert!(!wants_counts(&get_request("/")));
    }

    #[test]
    fn test_project_writes_purge_counts() {
        assert_eq!(
            invalidation_patterns(EntityKind::Projects),
            vec!["projects".to_string(), ":with-counts".to_string()]
        );
        assert_eq!(
            invalidation_patterns(EntityKind::Gallery),
            vec!["gallery".to_string()]
        );
    }

    #[tokio::test]
    async fn test_info_endpoint() {
        let app = create_router(test_state());
        let response = app.oneshot(get_request("/api/cache/info")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_item_route_uses_item_key() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = app.oneshot(get_request("/api/projects/2")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_CACHE], "MISS");
        assert_eq!(state.cache.keys().await, vec!["projects:id:2".to_string()]);
    }

    #[tokio::test]
    async fn test_categories_have_no_category_listing() {
        let app = create_router(test_state());
        let response = app
            .oneshot(get_request("/api/categories/category/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_item_not_cached() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = app.oneshot(get_request("/api/gallery/999")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.cache.is_empty().await);
    }
}
