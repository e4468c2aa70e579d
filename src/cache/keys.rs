//! Cache Key Module
//!
//! Builds colon-joined cache keys (`namespace:kind[:qualifier]*`).

use std::fmt;

use serde::Serialize;

/// Segment separator inside a key.
pub const KEY_SEPARATOR: char = ':';

// == Cache Key ==
/// A fully built cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already formatted key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a qualifier such as `with-counts`. Empty suffixes are ignored.
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        if !suffix.is_empty() {
            self.0.push(KEY_SEPARATOR);
            self.0.push_str(suffix);
        }
        self
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

// == Build Key ==
/// Joins `namespace`, `kind` and every non-empty qualifier with `:`.
///
/// Missing or empty qualifiers are dropped, so `build_key("projects", "all", &[None])`
/// collapses to `projects:all`.
pub fn build_key(namespace: &str, kind: &str, qualifiers: &[Option<&str>]) -> CacheKey {
    let mut key = String::with_capacity(namespace.len() + kind.len() + 1);
    key.push_str(namespace);
    key.push(KEY_SEPARATOR);
    key.push_str(kind);

    for qualifier in qualifiers.iter().flatten() {
        if !qualifier.is_empty() {
            key.push(KEY_SEPARATOR);
            key.push_str(qualifier);
        }
    }

    CacheKey(key)
}

// == Entity Kind ==
/// The entity collections whose responses get cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Projects,
    Gallery,
    Categories,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Projects,
        EntityKind::Gallery,
        EntityKind::Categories,
    ];

    /// Namespace segment, also the invalidation pattern for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Projects => "projects",
            EntityKind::Gallery => "gallery",
            EntityKind::Categories => "categories",
        }
    }

    /// Canonical key of the unfiltered listing.
    pub fn all_key(&self) -> CacheKey {
        build_key(self.as_str(), "all", &[])
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Canonical Keys ==
/// Constructors for the keys the public routes use.
pub struct CacheKeys;

impl CacheKeys {
    pub fn all_projects() -> CacheKey {
        EntityKind::Projects.all_key()
    }

    pub fn project_by_id(id: &str) -> CacheKey {
        build_key("projects", "id", &[Some(id)])
    }

    pub fn projects_by_category(category: &str) -> CacheKey {
        build_key("projects", "category", &[Some(category)])
    }

    pub fn all_gallery() -> CacheKey {
        EntityKind::Gallery.all_key()
    }

    pub fn gallery_by_category(category: &str) -> CacheKey {
        build_key("gallery", "category", &[Some(category)])
    }

    pub fn gallery_by_id(id: &str) -> CacheKey {
        build_key("gallery", "id", &[Some(id)])
    }

    pub fn all_categories() -> CacheKey {
        EntityKind::Categories.all_key()
    }

    pub fn category_by_keyword(keyword: &str) -> CacheKey {
        build_key("categories", "keyword", &[Some(keyword)])
    }

    /// Key of a single document of any kind.
    pub fn item(kind: EntityKind, id: &str) -> CacheKey {
        match kind {
            EntityKind::Categories => Self::category_by_keyword(id),
            other => build_key(other.as_str(), "id", &[Some(id)]),
        }
    }

    /// Key of a category-filtered listing of any kind.
    pub fn by_category(kind: EntityKind, category: &str) -> CacheKey {
        build_key(kind.as_str(), "category", &[Some(category)])
    }
}
