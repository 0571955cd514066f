//! Public types for the Hoard API.

mod entry;
mod freshness;
mod options;
mod resource;

pub use entry::{CacheEntry, EntryState};
pub use freshness::FreshnessPolicy;
pub use options::FetchOptions;
pub use resource::{ResourceId, file_uri, is_remote_resource};
