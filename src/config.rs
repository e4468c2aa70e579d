//! Configuration Module
//!
//! Loads the store settings and the per-entity TTL table from environment
//! variables once at startup. Nothing here changes after the process boots.

use std::env;
use std::str::FromStr;

use crate::cache::EntityKind;

/// TTL table in seconds, one value per cached shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlConfig {
    pub projects: u64,
    pub gallery: u64,
    pub categories: u64,
    pub project_by_id: u64,
    pub projects_by_category: u64,
    pub gallery_by_category: u64,
}

impl TtlConfig {
    /// Loads the TTL table, falling back to the defaults per variable.
    ///
    /// # Environment Variables
    /// - `TTL_PROJECTS` (default: 300)
    /// - `TTL_GALLERY` (default: 600)
    /// - `TTL_CATEGORIES` (default: 1800)
    /// - `TTL_PROJECT_BY_ID` (default: 300)
    /// - `TTL_PROJECTS_BY_CATEGORY` (default: 300)
    /// - `TTL_GALLERY_BY_CATEGORY` (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            projects: env_or("TTL_PROJECTS", defaults.projects),
            gallery: env_or("TTL_GALLERY", defaults.gallery),
            categories: env_or("TTL_CATEGORIES", defaults.categories),
            project_by_id: env_or("TTL_PROJECT_BY_ID", defaults.project_by_id),
            projects_by_category: env_or(
                "TTL_PROJECTS_BY_CATEGORY",
                defaults.projects_by_category,
            ),
            gallery_by_category: env_or("TTL_GALLERY_BY_CATEGORY", defaults.gallery_by_category),
        }
    }

    /// TTL for the "all" listing of an entity kind.
    pub fn for_kind(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Projects => self.projects,
            EntityKind::Gallery => self.gallery,
            EntityKind::Categories => self.categories,
        }
    }

    /// TTL for a single document of an entity kind.
    pub fn for_item(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Projects => self.project_by_id,
            other => self.for_kind(other),
        }
    }

    /// TTL for a category-filtered listing of an entity kind.
    pub fn for_category(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Projects => self.projects_by_category,
            EntityKind::Gallery => self.gallery_by_category,
            EntityKind::Categories => self.categories,
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            projects: 300,
            gallery: 600,
            categories: 1800,
            project_by_id: 300,
            projects_by_category: 300,
            gallery_by_category: 600,
        }
    }
}

/// Server and store configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fallback TTL in seconds for entries stored without one
    pub default_ttl: u64,
    /// Interval in seconds between expiry sweeps
    pub check_period: u64,
    /// Maximum number of keys the store holds
    pub max_keys: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Per-entity TTL table
    pub ttl: TtlConfig,
    /// Warm the cache in the background when the first request arrives
    pub warm_on_first_request: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CHECK_PERIOD` - Sweep interval in seconds (default: 60)
    /// - `MAX_KEYS` - Maximum cache keys (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 5000)
    /// - `WARM_ON_FIRST_REQUEST` - `true`/`false` (default: true)
    /// - `TTL_*` - per-entity TTLs, see `TtlConfig::from_env`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            check_period: env_or("CHECK_PERIOD", defaults.check_period),
            max_keys: env_or("MAX_KEYS", defaults.max_keys),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            ttl: TtlConfig::from_env(),
            warm_on_first_request: env_or(
                "WARM_ON_FIRST_REQUEST",
                defaults.warm_on_first_request,
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            check_period: 60,
            max_keys: 1000,
            server_port: 5000,
            ttl: TtlConfig::default(),
            warm_on_first_request: true,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
