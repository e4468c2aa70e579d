//! Integration Tests for the cached API
//!
//! Drives full request/response cycles through the router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{ETAG, IF_NONE_MATCH},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use hope_cache::{
    cache::{EntryStore, ManualClock},
    catalog::Catalog,
    config::TtlConfig,
    create_router, AppState, CacheManager,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn test_state() -> AppState {
    let cache = Arc::new(CacheManager::new(
        EntryStore::new(100, 300),
        TtlConfig::default(),
    ));
    AppState::new(cache, Arc::new(Catalog::seeded())).without_warmer()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_to_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn x_cache(response: &Response) -> &str {
    response.headers()["x-cache"].to_str().unwrap()
}

// == Read-Through ==

#[tokio::test]
async fn test_listing_miss_then_hit_with_identical_body() {
    let app = create_router(test_state());

    let first = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(x_cache(&first), "MISS");
    assert_eq!(first.headers()["x-cache-key"], "projects:all");
    assert_eq!(first.headers()["cache-control"], "public, max-age=300");
    let first_etag = first.headers()[ETAG].clone();
    let first_body = body_bytes(first).await;

    let second = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(x_cache(&second), "HIT");
    assert_eq!(second.headers()[ETAG], first_etag);
    let second_body = body_bytes(second).await;

    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn test_category_listing_uses_category_ttl() {
    let app = create_router(test_state());

    let response = send(&app, "GET", "/api/gallery/category/health", None).await;

    assert_eq!(response.headers()["x-cache-key"], "gallery:category:health");
    assert_eq!(response.headers()["cache-control"], "public, max-age=600");
    let json = body_to_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_entry_is_reloaded() {
    let clock = ManualClock::new(0);
    let cache = Arc::new(CacheManager::new(
        EntryStore::with_clock(100, 300, Arc::new(clock.clone())),
        TtlConfig::default(),
    ));
    let app = create_router(AppState::new(cache, Arc::new(Catalog::seeded())).without_warmer());

    send(&app, "GET", "/api/categories", None).await;
    clock.advance_ms(1_800_000);
    let still_fresh = send(&app, "GET", "/api/categories", None).await;
    assert_eq!(x_cache(&still_fresh), "HIT");

    clock.advance_ms(1);
    let reloaded = send(&app, "GET", "/api/categories", None).await;
    assert_eq!(x_cache(&reloaded), "MISS");
}

// == Write Invalidation ==

#[tokio::test]
async fn test_create_invalidates_kind_and_is_visible() {
    let state = test_state();
    let app = create_router(state.clone());

    send(&app, "GET", "/api/projects", None).await;
    send(&app, "GET", "/api/projects/1", None).await;
    send(&app, "GET", "/api/gallery", None).await;

    let created = send(
        &app,
        "POST",
        "/api/projects",
        Some(json!({"title": "Water Well", "category": "health"})),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    assert_eq!(state.cache.keys().await, vec!["gallery:all".to_string()]);

    let listing = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(x_cache(&listing), "MISS");
    assert_eq!(body_to_json(listing).await.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_project_write_purges_category_counts() {
    let state = test_state();
    let app = create_router(state.clone());

    let counted = send(&app, "GET", "/api/categories?counts=true", None).await;
    assert_eq!(counted.headers()["x-cache-key"], "categories:all:with-counts");
    let json = body_to_json(counted).await;
    assert_eq!(json[0]["projectCount"], 1);
    send(&app, "GET", "/api/categories", None).await;

    send(
        &app,
        "POST",
        "/api/projects",
        Some(json!({"title": "Tutoring", "category": "education"})),
    )
    .await;
    assert_eq!(state.cache.keys().await, vec!["categories:all".to_string()]);

    let recounted = send(&app, "GET", "/api/categories?counts=true", None).await;
    assert_eq!(x_cache(&recounted), "MISS");
    assert_eq!(body_to_json(recounted).await[0]["projectCount"], 2);
}

#[tokio::test]
async fn test_failed_write_keeps_cache() {
    let app = create_router(test_state());

    send(&app, "GET", "/api/categories", None).await;
    let rejected = send(
        &app,
        "POST",
        "/api/categories",
        Some(json!({"name": "No keyword"})),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let after = send(&app, "GET", "/api/categories", None).await;
    assert_eq!(x_cache(&after), "HIT");
}

#[tokio::test]
async fn test_update_and_delete_invalidate() {
    let state = test_state();
    let app = create_router(state.clone());

    send(&app, "GET", "/api/gallery/4", None).await;
    let updated = send(
        &app,
        "PATCH",
        "/api/gallery/4",
        Some(json!({"title": "Ribbon Cutting"})),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let fresh = send(&app, "GET", "/api/gallery/4", None).await;
    assert_eq!(x_cache(&fresh), "MISS");
    assert_eq!(body_to_json(fresh).await["title"], "Ribbon Cutting");

    let deleted = send(&app, "DELETE", "/api/gallery/4", None).await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(state.cache.is_empty().await);

    let gone = send(&app, "GET", "/api/gallery/4", None).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

// == Conditional Requests ==

#[tokio::test]
async fn test_if_none_match_returns_304_on_hit_and_miss() {
    let app = create_router(test_state());

    let first = send(&app, "GET", "/api/categories/health", None).await;
    let etag = first.headers()[ETAG].to_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/api/categories/health")
        .header(IF_NONE_MATCH, etag.as_str())
        .body(Body::empty())
        .unwrap();
    let cached = app.clone().oneshot(request).await.unwrap();
    assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(cached).await.is_empty());

    let request = Request::builder()
        .uri("/api/categories/health")
        .header(IF_NONE_MATCH, "\"something-else\"")
        .body(Body::empty())
        .unwrap();
    let stale = app.oneshot(request).await.unwrap();
    assert_eq!(stale.status(), StatusCode::OK);
}

// == Admin Surface ==

#[tokio::test]
async fn test_stats_reflect_traffic() {
    let app = create_router(test_state());

    send(&app, "GET", "/api/projects", None).await;
    send(&app, "GET", "/api/projects", None).await;

    let json = body_to_json(send(&app, "GET", "/api/cache/stats", None).await).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["stats"]["hits"], 1);
    assert_eq!(json["stats"]["misses"], 1);
    assert_eq!(json["stats"]["sets"], 1);
    assert_eq!(json["stats"]["hitRate"], 0.5);
    assert_eq!(json["stats"]["store"]["keys"], 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(test_state());

    let response = send(&app, "GET", "/api/cache/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["health"]["overall"], true);
    assert!(json["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_invalidate_endpoint() {
    let state = test_state();
    let app = create_router(state.clone());

    send(&app, "GET", "/api/projects", None).await;
    send(&app, "GET", "/api/projects/category/food", None).await;
    send(&app, "GET", "/api/categories", None).await;

    let response = send(&app, "DELETE", "/api/cache/invalidate/projects", None).await;
    let json = body_to_json(response).await;

    assert_eq!(json["deletedCount"], 2);
    assert_eq!(json["pattern"], "projects");
    assert_eq!(state.cache.keys().await, vec!["categories:all".to_string()]);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let state = test_state();
    let app = create_router(state.clone());

    send(&app, "GET", "/api/gallery", None).await;
    let response = send(&app, "DELETE", "/api/cache/clear", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["success"], true);
    assert!(state.cache.is_empty().await);
}

#[tokio::test]
async fn test_warm_endpoint_then_hit() {
    let app = create_router(test_state());

    let json = body_to_json(send(&app, "POST", "/api/cache/warm", None).await).await;
    assert_eq!(json["warmed"], json!(["projects", "gallery", "categories"]));
    assert_eq!(json["failed"], json!([]));

    let listing = send(&app, "GET", "/api/categories", None).await;
    assert_eq!(x_cache(&listing), "HIT");
}

#[tokio::test]
async fn test_info_endpoint() {
    let app = create_router(test_state());

    let json = body_to_json(send(&app, "GET", "/api/cache/info", None).await).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["type"], "in-memory");
}

// == Startup Warming ==

#[tokio::test]
async fn test_first_request_warms_in_background() {
    let cache = Arc::new(CacheManager::new(
        EntryStore::new(100, 300),
        TtlConfig::default(),
    ));
    let state = AppState::new(cache.clone(), Arc::new(Catalog::seeded()));
    let mut reports = state.warmer.as_ref().unwrap().subscribe();
    let app = create_router(state);

    let response = send(&app, "GET", "/api/cache/info", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(5), reports.changed())
        .await
        .expect("warm run did not finish")
        .unwrap();
    let report = reports.borrow().clone().unwrap();
    assert_eq!(report.warmed.len(), 3);

    let listing = send(&app, "GET", "/api/gallery", None).await;
    assert_eq!(x_cache(&listing), "HIT");
}
