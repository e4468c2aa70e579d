//! Background Tasks Module
//!
//! Tasks that run detached from request handling.
//!
//! # Tasks
//! - Expiry sweep: drops expired cache entries on a fixed interval
//! - Cache warming: runs the data loaders once and publishes the outcome

mod sweep;
mod warm;

pub use sweep::spawn_sweep_task;
pub use warm::spawn_warm_task;
