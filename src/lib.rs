//! Hope Cache - response caching for a charity catalog API
//!
//! An in-memory TTL cache with a key cap, read-through and write-invalidation
//! middleware for axum, ETag conditional requests, and an admin surface.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheKey, CacheKeys, CacheManager, DataLoaders, EntityKind};
pub use config::Config;
pub use tasks::{spawn_sweep_task, spawn_warm_task};
