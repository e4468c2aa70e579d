//! Demo Catalog
//!
//! In-memory store of the JSON documents the public routes serve: projects,
//! gallery items and categories. Projects and gallery items are addressed by
//! a generated `id`, categories by their `keyword`. Documents carry a
//! `category` field naming a category keyword.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{DataLoaders, EntityKind};

/// Field a document of `kind` is addressed by.
pub fn id_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Categories => "keyword",
        _ => "id",
    }
}

fn field_matches(doc: &Value, field: &str, expected: &str) -> bool {
    match doc.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        _ => false,
    }
}

#[derive(Debug)]
pub struct Catalog {
    collections: RwLock<BTreeMap<EntityKind, Vec<Value>>>,
    next_id: AtomicU64,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Catalog preloaded with a handful of sample documents.
    pub fn seeded() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            EntityKind::Categories,
            vec![
                json!({"keyword": "education", "name": "Education"}),
                json!({"keyword": "health", "name": "Health"}),
                json!({"keyword": "food", "name": "Food Security"}),
            ],
        );
        collections.insert(
            EntityKind::Projects,
            vec![
                json!({"id": "1", "title": "School Supplies Drive", "category": "education"}),
                json!({"id": "2", "title": "Mobile Clinic", "category": "health"}),
                json!({"id": "3", "title": "Community Kitchen", "category": "food"}),
            ],
        );
        collections.insert(
            EntityKind::Gallery,
            vec![
                json!({
                    "id": "4",
                    "title": "Opening Day",
                    "category": "education",
                    "imageUrl": "/img/opening-day.jpg"
                }),
                json!({
                    "id": "5",
                    "title": "Clinic Visit",
                    "category": "health",
                    "imageUrl": "/img/clinic-visit.jpg"
                }),
            ],
        );

        Self {
            collections: RwLock::new(collections),
            next_id: AtomicU64::new(6),
        }
    }

    pub async fn list(&self, kind: EntityKind) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn find(&self, kind: EntityKind, id: &str) -> Option<Value> {
        let field = id_field(kind);
        self.collections
            .read()
            .await
            .get(&kind)?
            .iter()
            .find(|doc| field_matches(doc, field, id))
            .cloned()
    }

    pub async fn by_category(&self, kind: EntityKind, category: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(&kind)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| field_matches(doc, "category", category))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Categories, each with a `projectCount` of projects filed under it.
    pub async fn categories_with_counts(&self) -> Vec<Value> {
        let collections = self.collections.read().await;
        let projects = collections
            .get(&EntityKind::Projects)
            .map(Vec::as_slice)
            .unwrap_or_default();

        collections
            .get(&EntityKind::Categories)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|category| {
                let mut doc = category.clone();
                let count = category
                    .get("keyword")
                    .and_then(Value::as_str)
                    .map(|keyword| {
                        projects
                            .iter()
                            .filter(|p| field_matches(p, "category", keyword))
                            .count()
                    })
                    .unwrap_or(0);
                if let Value::Object(fields) = &mut doc {
                    fields.insert("projectCount".to_string(), json!(count));
                }
                doc
            })
            .collect()
    }

    /// Adds a document. Projects and gallery items get a fresh `id`, which
    /// replaces any `id` in the input.
    pub async fn insert(&self, kind: EntityKind, mut fields: Map<String, Value>) -> Value {
        if kind != EntityKind::Categories {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            fields.insert("id".to_string(), Value::String(id.to_string()));
        }

        let doc = Value::Object(fields);
        self.collections
            .write()
            .await
            .entry(kind)
            .or_default()
            .push(doc.clone());
        debug!(kind = %kind, "catalog insert");
        doc
    }

    /// Merges `patch` into the document. The identifying field is never
    /// overwritten. Returns the updated document, or `None` if absent.
    pub async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        mut patch: Map<String, Value>,
    ) -> Option<Value> {
        let field = id_field(kind);
        patch.remove(field);

        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(&kind)?
            .iter_mut()
            .find(|doc| field_matches(doc, field, id))?;

        if let Value::Object(existing) = &mut *doc {
            existing.extend(patch);
        }
        debug!(kind = %kind, id, "catalog update");
        Some(doc.clone())
    }

    pub async fn remove(&self, kind: EntityKind, id: &str) -> bool {
        let field = id_field(kind);
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&kind) else {
            return false;
        };

        let before = docs.len();
        docs.retain(|doc| !field_matches(doc, field, id));
        let removed = docs.len() < before;
        debug!(kind = %kind, id, removed, "catalog remove");
        removed
    }

    /// Warm loaders returning the full listing of each kind.
    pub fn loaders(self: &Arc<Self>) -> DataLoaders {
        EntityKind::ALL
            .into_iter()
            .fold(DataLoaders::new(), |loaders, kind| {
                let catalog = Arc::clone(self);
                loaders.with(kind, move || {
                    let catalog = catalog.clone();
                    async move { Ok(Value::Array(catalog.list(kind).await)) }
                })
            })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
