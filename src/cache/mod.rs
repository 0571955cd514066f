//! Caching subsystem.
//!
//! - [`CacheEngine`] — the entry point: index, freshness checks and
//!   deduplicated fetches. Built through [`Hoard::builder()`].
//! - [`inflight`] — the shared handle every caller of a key waits on while
//!   that key is being fetched.
//! - `store` — on-disk layout, scratch writes and atomic promotion.

mod builder;
mod engine;
pub mod inflight;
mod store;

pub use builder::{Hoard, HoardBuilder};
pub use engine::{CacheEngine, CacheStats};
pub use inflight::InFlightRequest;
pub use store::DiskUsage;
