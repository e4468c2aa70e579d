//! Conditional GET support for JSON routes.
//!
//! Attaches an ETag to `200 OK` JSON responses and answers `304 Not Modified`
//! when the client's `If-None-Match` already names it. The ETag fingerprints
//! the exact bytes sent. Responses that carry an ETag (for instance from the
//! read-through layer) are compared as is.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{
        header::{ETAG, IF_NONE_MATCH},
        HeaderMap, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::etag::{
    compute_etag, exceeds_limit, if_none_match_matches, is_json, not_modified, set_etag,
};
use crate::cache::MAX_VALUE_SIZE;
use crate::error::ApiError;

/// Middleware applied with `middleware::from_fn(conditional_get)`.
pub async fn conditional_get(request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let if_none_match = request.headers().get(IF_NONE_MATCH).cloned();
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    if let Some(existing) = response.headers().get(ETAG) {
        let Ok(etag) = existing.to_str() else {
            return response;
        };
        if if_none_match_matches(if_none_match.as_ref(), etag) {
            return not_modified(response.headers().clone());
        }
        return response;
    }

    if !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    if exceeds_limit(&parts.headers, &body, MAX_VALUE_SIZE) {
        debug!("response too large to fingerprint, skipping etag");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_VALUE_SIZE).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer response for etag");
            return ApiError::Internal("failed to read response body".to_string())
                .into_response();
        }
    };

    let etag = compute_etag(&bytes);

    if if_none_match_matches(if_none_match.as_ref(), &etag) {
        let mut headers = HeaderMap::new();
        set_etag(&mut headers, &etag);
        return not_modified(headers);
    }

    set_etag(&mut parts.headers, &etag);
    Response::from_parts(parts, Body::from(bytes))
}
