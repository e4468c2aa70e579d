//! Request DTOs for the catalog routes
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::EntityKind;
use crate::catalog::id_field;

/// Query string of a listing request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// Categories only: attach a `projectCount` to each category
    #[serde(default)]
    pub counts: bool,
}

/// Body of a create or update request: any JSON object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DocumentRequest(pub Map<String, Value>);

impl DocumentRequest {
    /// Validates a create request for `kind`.
    ///
    /// Categories are addressed by keyword, so a new category must name one.
    /// Returns an error message if validation fails, None if valid.
    pub fn validate_create(&self, kind: EntityKind) -> Option<String> {
        if kind != EntityKind::Categories {
            return None;
        }

        let field = id_field(kind);
        match self.0.get(field) {
            Some(Value::String(keyword)) if !keyword.trim().is_empty() => None,
            _ => Some(format!("Field '{}' must be a non-empty string", field)),
        }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}
