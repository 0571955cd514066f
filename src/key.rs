//! Cache key derivation.
//!
//! A key is the hex SHA-256 digest of the normalised URL and every
//! key-affecting header, followed by the URL's file extension when it has a
//! sane one (`3f9a…c2.png`). Keys only contain `[0-9a-f.]` plus extension
//! alphanumerics, so they double as file names on every platform.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{FetchOptions, ResourceId};

/// Stable identity of a cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-derived key (e.g. a file name read back from disk).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the canonical path for this key.
    pub fn file_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives [`CacheKey`]s and canonical paths. Pure; never touches the disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyResolver;

impl KeyResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, resource: &ResourceId, options: &FetchOptions) -> CacheKey {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, resource.as_str());
        for (name, value) in options.headers() {
            update_field(&mut hasher, name);
            update_field(&mut hasher, value);
        }
        let digest = hex::encode(hasher.finalize());
        match resource.extension() {
            Some(ext) => CacheKey(format!("{digest}.{ext}")),
            None => CacheKey(digest),
        }
    }

    /// Canonical path of `key` under `root`.
    pub fn path_for(&self, root: &Path, key: &CacheKey) -> PathBuf {
        root.join(key.file_name())
    }
}

/// Length-prefix each field so `("ab", "c")` and `("a", "bc")` hash differently.
fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
