//! On-disk layout: one file per entry under the cache root, plus a scratch
//! directory for downloads in progress.
//!
//! ```text
//! <root>/
//!   3f9a…c2.png        canonical file, named by its CacheKey
//!   .tmp/
//!     3f9a…c2.png.4711.3.part   download in progress
//! ```
//!
//! Canonical files are only ever created by renaming a complete scratch
//! file, so a reader never sees a partially written canonical path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, warn};

use crate::fetch::ByteStream;
use crate::key::{CacheKey, KeyResolver};
use crate::{HoardError, Result};

/// Name of the scratch directory inside the cache root.
pub(crate) const SCRATCH_DIR: &str = ".tmp";

/// Files and bytes currently stored under the cache root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub files: u64,
    pub bytes: u64,
}

/// A fully written download waiting to be promoted.
#[derive(Debug)]
pub(crate) struct TempFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Scratch file sequence, shared by every store in the process so two
/// engines on one root never pick the same name.
static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

pub(crate) struct DiskStore {
    root: PathBuf,
    scratch: PathBuf,
    resolver: KeyResolver,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Self {
        let scratch = root.join(SCRATCH_DIR);
        Self {
            root,
            scratch,
            resolver: KeyResolver::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn canonical_path(&self, key: &CacheKey) -> PathBuf {
        self.resolver.path_for(&self.root, key)
    }

    /// Create the layout and sweep scratch files left by an interrupted run.
    ///
    /// Only files written by other processes are swept; files named with this
    /// process's id may belong to another engine on the same root that is
    /// still downloading.
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.scratch)
            .await
            .map_err(|e| write_error("create cache dir", &self.scratch, e))?;

        let mut swept = 0usize;
        let mut entries = read_dir(&self.scratch).await?;
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(|e| write_error("scan scratch dir", &self.scratch, e))?;
            if scratch_owner(&entry.file_name().to_string_lossy()) == Some(std::process::id()) {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => swept += 1,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "failed to sweep stale scratch file")
                }
            }
        }
        if swept > 0 {
            debug!(root = %self.root.display(), swept, "swept stale scratch files");
        }
        Ok(())
    }

    /// Stream `body` into a fresh scratch file.
    ///
    /// On any error the scratch file is removed before returning. Stream
    /// errors surface as `FetchFailed`, filesystem errors as `WriteFailed`.
    pub async fn write_temp(&self, key: &CacheKey, body: ByteStream) -> Result<TempFile> {
        fs::create_dir_all(&self.scratch)
            .await
            .map_err(|e| write_error("create scratch dir", &self.scratch, e))?;

        let path = self.scratch.join(format!(
            "{}.{}.{}.part",
            key.file_name(),
            std::process::id(),
            SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        match write_stream(&path, body).await {
            Ok(bytes) => Ok(TempFile { path, bytes }),
            Err(e) => {
                self.discard(&path).await;
                Err(e)
            }
        }
    }

    /// Atomically move a complete scratch file to the canonical path of `key`.
    pub async fn promote(&self, temp: &TempFile, key: &CacheKey) -> Result<PathBuf> {
        let target = self.canonical_path(key);
        if let Err(e) = fs::rename(&temp.path, &target).await {
            self.discard(&temp.path).await;
            return Err(write_error("promote", &target, e));
        }
        Ok(target)
    }

    /// Best-effort removal of a scratch file.
    pub async fn discard(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove scratch file"),
        }
    }

    /// Modification time of the canonical file, if it exists.
    pub async fn modified_at(&self, key: &CacheKey) -> Option<SystemTime> {
        let path = self.canonical_path(key);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.modified().ok(),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat cached file");
                None
            }
        }
    }

    /// Delete the canonical file of `key`. Returns whether a file was removed.
    pub async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let path = self.canonical_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(write_error("remove", &path, e)),
        }
    }

    /// Delete everything under the root except the scratch directory.
    ///
    /// Scratch files belong to downloads that may still be running; they are
    /// swept by [`prepare`](Self::prepare) on the next start instead.
    /// Returns the number of entries removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(dir) => ReadDirStream::new(dir),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(write_error("scan cache dir", &self.root, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(|e| write_error("scan cache dir", &self.root, e))?;
            if entry.file_name() == SCRATCH_DIR {
                continue;
            }
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| write_error("inspect", &path, e))?;
            let result = if file_type.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(write_error("remove", &path, e)),
            }
        }
        Ok(removed)
    }

    /// Count canonical files and their total size.
    pub async fn usage(&self) -> Result<DiskUsage> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(dir) => ReadDirStream::new(dir),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DiskUsage::default()),
            Err(e) => return Err(write_error("scan cache dir", &self.root, e)),
        };

        let mut usage = DiskUsage::default();
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(|e| write_error("scan cache dir", &self.root, e))?;
            if entry.file_name() == SCRATCH_DIR {
                continue;
            }
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => {
                    usage.files += 1;
                    usage.bytes += meta.len();
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(write_error("inspect", &entry.path(), e)),
            }
        }
        Ok(usage)
    }
}

/// Process id embedded in a scratch file name (`{key}.{pid}.{seq}.part`).
fn scratch_owner(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(".part")?;
    let mut parts = stem.rsplitn(3, '.');
    let _seq = parts.next()?;
    parts.next()?.parse().ok()
}

async fn read_dir(path: &Path) -> Result<ReadDirStream> {
    fs::read_dir(path)
        .await
        .map(ReadDirStream::new)
        .map_err(|e| write_error("scan", path, e))
}

async fn write_stream(path: &Path, mut body: ByteStream) -> Result<u64> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| write_error("create", path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| write_error("write", path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| write_error("flush", path, e))?;
    file.sync_all().await.map_err(|e| write_error("sync", path, e))?;
    Ok(written)
}

fn write_error(action: &str, path: &Path, err: std::io::Error) -> HoardError {
    HoardError::WriteFailed(format!("failed to {action} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;

    use crate::error::FetchError;

    fn body(chunks: Vec<std::result::Result<&'static str, FetchError>>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    fn key() -> CacheKey {
        CacheKey::from_raw("abc123.png")
    }

    #[tokio::test]
    async fn write_then_promote() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        store.prepare().await.unwrap();

        let temp = store
            .write_temp(&key(), body(vec![Ok("hello "), Ok("world")]))
            .await
            .unwrap();
        assert_eq!(temp.bytes, 11);
        assert!(!store.canonical_path(&key()).exists());

        let path = store.promote(&temp, &key()).await.unwrap();
        assert_eq!(path, dir.path().join("abc123.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert!(!temp.path.exists());
    }

    #[tokio::test]
    async fn broken_stream_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        store.prepare().await.unwrap();

        let err = store
            .write_temp(
                &key(),
                body(vec![Ok("partial"), Err(FetchError::Stream("reset".into()))]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HoardError::FetchFailed(FetchError::Stream(_))));

        let scratch: Vec<_> = std::fs::read_dir(dir.path().join(SCRATCH_DIR))
            .unwrap()
            .collect();
        assert!(scratch.is_empty());
        assert!(!store.canonical_path(&key()).exists());
    }

    #[tokio::test]
    async fn prepare_sweeps_stale_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join(SCRATCH_DIR);
        std::fs::create_dir_all(&scratch).unwrap();
        std::fs::write(scratch.join("old.png.0.0.part"), b"junk").unwrap();
        std::fs::write(scratch.join("unrelated"), b"junk").unwrap();

        DiskStore::new(dir.path().to_path_buf())
            .prepare()
            .await
            .unwrap();
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn prepare_keeps_scratch_files_of_this_process() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join(SCRATCH_DIR);
        std::fs::create_dir_all(&scratch).unwrap();
        let live = scratch.join(format!("abc.png.{}.7.part", std::process::id()));
        std::fs::write(&live, b"downloading").unwrap();

        DiskStore::new(dir.path().to_path_buf())
            .prepare()
            .await
            .unwrap();
        assert!(live.exists());
    }

    #[test]
    fn scratch_owner_parses_pid() {
        assert_eq!(scratch_owner("3f9a.png.4711.3.part"), Some(4711));
        assert_eq!(scratch_owner("3f9a.4711.3.part"), Some(4711));
        assert_eq!(scratch_owner("3f9a.png"), None);
        assert_eq!(scratch_owner("junk.part"), None);
    }

    #[tokio::test]
    async fn clear_keeps_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        store.prepare().await.unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::fs::write(dir.path().join("b"), b"b").unwrap();
        std::fs::write(dir.path().join(SCRATCH_DIR).join("c.part"), b"c").unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(!dir.path().join("a.png").exists());
        assert!(dir.path().join(SCRATCH_DIR).join("c.part").exists());
    }

    #[tokio::test]
    async fn clear_and_usage_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("never-created"));
        assert_eq!(store.clear().await.unwrap(), 0);
        assert_eq!(store.usage().await.unwrap(), DiskUsage::default());
    }

    #[tokio::test]
    async fn usage_counts_canonical_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        store.prepare().await.unwrap();
        std::fs::write(dir.path().join("a.png"), b"12345").unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"123").unwrap();
        std::fs::write(dir.path().join(SCRATCH_DIR).join("c.part"), b"ignored").unwrap();

        let usage = store.usage().await.unwrap();
        assert_eq!(usage, DiskUsage { files: 2, bytes: 8 });
    }

    #[tokio::test]
    async fn remove_reports_whether_file_existed() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        std::fs::write(store.canonical_path(&key()), b"x").unwrap();

        assert!(store.modified_at(&key()).await.is_some());
        assert!(store.remove(&key()).await.unwrap());
        assert!(!store.remove(&key()).await.unwrap());
        assert!(store.modified_at(&key()).await.is_none());
    }
}
