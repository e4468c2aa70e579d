//! API Module
//!
//! HTTP handlers and routing for the charity API and its cache admin surface.
//!
//! # Endpoints
//! - `/api/projects`, `/api/gallery`, `/api/categories` - cached catalog routes
//! - `GET /api/cache/stats` - cache statistics
//! - `GET /api/cache/health` - store probe (200 or 503)
//! - `DELETE /api/cache/clear` - drop every entry
//! - `DELETE /api/cache/invalidate/:pattern` - drop entries by substring
//! - `POST /api/cache/warm` - run the warm loaders now
//! - `GET /api/cache/info` - cache description

pub mod catalog;
pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
