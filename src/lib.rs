//! Hoard - disk cache for remotely fetched images
//!
//! Maps a remote resource (URL plus fetch options) to a durable local file.
//! Repeated requests are served from disk; concurrent requests for the same
//! resource share a single download; a failed download never leaves a
//! partial file where a reader could see it.
//!
//! # Example
//!
//! ```rust,no_run
//! use hoard::{FetchOptions, Hoard};
//!
//! #[tokio::main]
//! async fn main() -> hoard::Result<()> {
//!     let cache = Hoard::builder().cache_dir("/tmp/hoard").build()?;
//!
//!     let path = cache
//!         .get("https://example.com/avatar.png", &FetchOptions::default(), false, None)
//!         .await?;
//!
//!     println!("cached at {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Freshness
//!
//! Each call decides how stale an entry may be, highest priority first:
//! `bypass_cache`, then the call's `max_age`, then the engine default
//! (by default entries never expire; only [`CacheEngine::clear`] and
//! [`CacheEngine::remove`] drop them).

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod key;
pub mod telemetry;
pub mod types;
mod version;

// Re-export main types at crate root
pub use cache::{CacheEngine, CacheStats, DiskUsage, Hoard, HoardBuilder, InFlightRequest};
pub use config::{CacheConfig, HttpConfig, RetrySettings};
pub use error::{FetchError, HoardError, Result};
pub use fetch::{ByteStream, Fetcher, RetryConfig, RetryingFetcher};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use key::{CacheKey, KeyResolver};
pub use types::{
    CacheEntry, EntryState, FetchOptions, FreshnessPolicy, ResourceId, file_uri,
    is_remote_resource,
};
pub use version::{PKG_VERSION, user_agent};
