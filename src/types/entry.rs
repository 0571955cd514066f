//! Cache entry metadata.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use super::FreshnessPolicy;
use crate::key::CacheKey;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// A fetch for the key is running.
    Pending,
    /// The file at the canonical path is complete.
    Ready,
    /// The last fetch failed. Never stored; only reported on the settled request.
    Failed,
}

/// One cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// Canonical on-disk location, derived from `key`.
    pub path: PathBuf,
    /// When the file was last successfully written. `None` while pending.
    pub fetched_at: Option<SystemTime>,
    pub state: EntryState,
}

impl CacheEntry {
    pub fn ready(key: CacheKey, path: PathBuf, fetched_at: SystemTime) -> Self {
        Self {
            key,
            path,
            fetched_at: Some(fetched_at),
            state: EntryState::Ready,
        }
    }

    pub fn pending(key: CacheKey, path: PathBuf) -> Self {
        Self {
            key,
            path,
            fetched_at: None,
            state: EntryState::Pending,
        }
    }

    /// Whether this entry may be served under `policy` at `now`.
    pub fn is_fresh(&self, policy: &FreshnessPolicy, now: SystemTime) -> bool {
        match (self.state, self.fetched_at) {
            (EntryState::Ready, Some(at)) => policy.is_fresh(at, now),
            _ => false,
        }
    }
}
