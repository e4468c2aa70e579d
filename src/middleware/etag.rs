//! ETag and cache header helpers shared by the middleware.

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::cache::CacheKey;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_CACHE_KEY: HeaderName = HeaderName::from_static("x-cache-key");

/// Whether a response was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Quoted base64 of the payload bytes.
pub fn compute_etag(payload: &[u8]) -> String {
    format!("\"{}\"", STANDARD.encode(payload))
}

/// Serializes `value` the way it is sent to clients and returns the bytes
/// with their ETag.
pub fn encode_payload(value: &Value) -> serde_json::Result<(Bytes, String)> {
    let bytes = serde_json::to_vec(value)?;
    let etag = compute_etag(&bytes);
    Ok((Bytes::from(bytes), etag))
}

/// True if `If-None-Match` names `etag`, either directly, inside a comma
/// separated list, or via `*`.
pub fn if_none_match_matches(header: Option<&HeaderValue>, etag: &str) -> bool {
    let Some(raw) = header.and_then(|value| value.to_str().ok()) else {
        return false;
    };

    raw.split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate == etag)
}

pub fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// True when the response body is known to be larger than `limit` before
/// reading it, from either `Content-Length` or the body's size hint.
pub fn exceeds_limit(headers: &HeaderMap, body: &Body, limit: usize) -> bool {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    declared.max(body.size_hint().lower()) > limit as u64
}

/// Sets `X-Cache`, `X-Cache-Key`, `Cache-Control` and `ETag`.
pub fn apply_cache_headers(
    headers: &mut HeaderMap,
    status: CacheStatus,
    key: &CacheKey,
    ttl: u64,
    etag: &str,
) {
    headers.insert(X_CACHE, HeaderValue::from_static(status.as_str()));
    if let Ok(value) = HeaderValue::from_str(key.as_str()) {
        headers.insert(X_CACHE_KEY, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl)) {
        headers.insert(CACHE_CONTROL, value);
    }
    set_etag(headers, etag);
}

pub fn set_etag(headers: &mut HeaderMap, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(ETAG, value);
    }
}

/// Bare 304 carrying the given headers minus any body description.
pub fn not_modified(mut headers: HeaderMap) -> Response {
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    *response.headers_mut() = headers;
    response
}

/// 200 JSON response around already serialized bytes.
pub fn json_response(body: Bytes, mut headers: HeaderMap) -> Response {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut response = Response::new(Body::from(body));
    *response.headers_mut() = headers;
    response
}
