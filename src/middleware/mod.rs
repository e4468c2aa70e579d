//! HTTP Cache Middleware
//!
//! axum middleware layering the cache manager onto routes:
//! - `read_through` - serve GETs from cache, store handler output on a miss
//! - `invalidate_on_write` - purge key patterns after successful writes
//! - `conditional_get` - ETag / `If-None-Match` handling for JSON routes
//! - `warm_on_first_request` - one-shot background cache warming
//!
//! Cache failures inside these layers are logged and the request proceeds
//! uncached.

mod conditional;
mod etag;
mod invalidate;
mod read_through;
mod warm;

pub use conditional::conditional_get;
pub use etag::{compute_etag, encode_payload, CacheStatus, X_CACHE, X_CACHE_KEY};
pub use invalidate::{invalidate_on_write, InvalidateOnWrite, PatternFn, PatternSource};
pub use read_through::{read_through, KeyFn, KeySource, ReadThrough};
pub use warm::{warm_on_first_request, StartupWarmer};
