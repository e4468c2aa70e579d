//! Catalog Handlers
//!
//! CRUD handlers shared by every entity kind. The kind comes from an
//! `Extension` set on the kind's router; caching is layered on by the router,
//! so these handlers only talk to the catalog.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use super::handlers::AppState;
use crate::cache::EntityKind;
use crate::error::ApiError;
use crate::models::{DocumentRequest, ListParams};

fn not_found(kind: EntityKind, id: &str) -> ApiError {
    ApiError::NotFound(format!("{}/{}", kind, id))
}

/// Handler for GET /api/<kind>
///
/// `?counts=true` on categories attaches project counts.
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let docs = if kind == EntityKind::Categories && params.counts {
        state.catalog.categories_with_counts().await
    } else {
        state.catalog.list(kind).await
    };
    Json(Value::Array(docs))
}

/// Handler for GET /api/<kind>/:id
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog
        .find(kind, &id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(kind, &id))
}

/// Handler for GET /api/<kind>/category/:category
pub async fn by_category_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(category): Path<String>,
) -> Json<Value> {
    Json(Value::Array(state.catalog.by_category(kind, &category).await))
}

/// Handler for POST /api/<kind>
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Json(req): Json<DocumentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(error_msg) = req.validate_create(kind) {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    if kind == EntityKind::Categories {
        if let Some(Value::String(keyword)) = req.0.get("keyword") {
            if state.catalog.find(kind, keyword).await.is_some() {
                return Err(ApiError::InvalidRequest(format!(
                    "Category '{}' already exists",
                    keyword
                )));
            }
        }
    }

    let doc = state.catalog.insert(kind, req.into_fields()).await;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Handler for PUT and PATCH /api/<kind>/:id
pub async fn update_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<String>,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog
        .update(kind, &id, req.into_fields())
        .await
        .map(Json)
        .ok_or_else(|| not_found(kind, &id))
}

/// Handler for DELETE /api/<kind>/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.catalog.remove(kind, &id).await {
        return Err(not_found(kind, &id));
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Deleted {}/{}", kind, id),
    })))
}
