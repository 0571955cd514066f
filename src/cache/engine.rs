//! The cache engine: index, freshness, deduplicated fetches and promotion.
//!
//! # Locking
//!
//! Two locks, always taken in this order when both are needed:
//!
//! 1. `disk` (async `RwLock<()>`): promotions, disk adoption and index
//!    settlement hold it shared; `clear` and `remove` hold it exclusively, so
//!    they never interleave with a rename or with the index update that
//!    follows it.
//! 2. `state` (sync `Mutex`): the index and the in-flight set. Held only for
//!    map operations, never across an `.await`.
//!
//! Network and file I/O run without `state` held; a slow download only
//! occupies its own key's [`InFlightRequest`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use super::inflight::{InFlightGuard, InFlightRequest, InFlightSet};
use super::store::{DiskStore, DiskUsage};
use crate::fetch::Fetcher;
use crate::key::{CacheKey, KeyResolver};
use crate::telemetry;
use crate::types::{CacheEntry, FetchOptions, FreshnessPolicy, ResourceId};
use crate::Result;

/// Snapshot of engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Ready entries known to the in-memory index.
    pub indexed: usize,
    /// Fetches currently running.
    pub in_flight: usize,
    /// What is actually on disk (may include files not yet adopted).
    pub disk: DiskUsage,
}

#[derive(Default)]
struct EngineState {
    index: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, Arc<InFlightRequest>>,
}

pub(crate) struct EngineInner {
    store: DiskStore,
    fetcher: Arc<dyn Fetcher>,
    resolver: KeyResolver,
    default_max_age: Option<Duration>,
    state: Mutex<EngineState>,
    disk: Arc<RwLock<()>>,
    prepared: OnceCell<()>,
}

impl EngineInner {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InFlightSet for EngineInner {
    fn settle(&self, request: &Arc<InFlightRequest>, promoted: Option<&PathBuf>) {
        let key = request.key();
        let mut state = self.lock();
        if let Some(path) = promoted {
            state.index.insert(
                key.clone(),
                CacheEntry::ready(key.clone(), path.clone(), SystemTime::now()),
            );
        }
        if state
            .in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, request))
        {
            state.in_flight.remove(key);
        }
    }
}

/// Resolves remote resources to local files, fetching at most once per key
/// at a time.
///
/// Cheap to clone; clones share the same index and in-flight set. Fetches
/// run as spawned tokio tasks, so an engine must be used from within a
/// tokio runtime.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

impl CacheEngine {
    pub(crate) fn new(
        cache_dir: PathBuf,
        fetcher: Arc<dyn Fetcher>,
        default_max_age: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store: DiskStore::new(cache_dir),
                fetcher,
                resolver: KeyResolver::new(),
                default_max_age,
                state: Mutex::new(EngineState::default()),
                disk: Arc::new(RwLock::new(())),
                prepared: OnceCell::new(),
            }),
        }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        self.inner.store.root()
    }

    /// Resolve `identifier` to a local file, fetching it if needed.
    ///
    /// - `bypass_cache` forces a fetch even when a fresh entry exists.
    /// - `max_age` overrides the engine's default freshness for this call;
    ///   `Duration::ZERO` always refetches.
    ///
    /// Concurrent calls for the same key share one fetch and observe the same
    /// outcome. A failed fetch leaves any previously cached file in place.
    pub async fn get(
        &self,
        identifier: &str,
        options: &FetchOptions,
        bypass_cache: bool,
        max_age: Option<Duration>,
    ) -> Result<PathBuf> {
        let resource = ResourceId::parse(identifier)?;
        let key = self.inner.resolver.resolve(&resource, options);
        let policy = FreshnessPolicy::resolve(bypass_cache, max_age, self.inner.default_max_age);

        if let Some(path) = self.lookup(&key, &policy) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
            debug!(key = %key, "cache hit");
            return Ok(path);
        }

        if !policy.is_bypass() {
            if let Some(path) = self.adopt(&key, &policy).await {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                debug!(key = %key, path = %path.display(), "adopted cached file from disk");
                return Ok(path);
            }
        }

        let request = match self.join_or_start(&key, &policy) {
            Attach::Fresh(path) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                return Ok(path);
            }
            Attach::Joined(request) => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                metrics::counter!(telemetry::INFLIGHT_JOINS_TOTAL).increment(1);
                debug!(key = %key, "joined in-flight fetch");
                request
            }
            Attach::Owner(request) => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                debug!(key = %key, url = %resource, "cache miss, fetching");
                self.spawn_fetch(Arc::clone(&request), resource, options.clone());
                request
            }
        };

        request.wait().await
    }

    /// Fast path: a fresh ready entry in the index. No I/O.
    fn lookup(&self, key: &CacheKey, policy: &FreshnessPolicy) -> Option<PathBuf> {
        let state = self.inner.lock();
        state
            .index
            .get(key)
            .filter(|entry| entry.is_fresh(policy, SystemTime::now()))
            .map(|entry| entry.path.clone())
    }

    /// Adopt a canonical file written by an earlier process.
    ///
    /// Only runs for keys the index has never seen and that are not being
    /// fetched; the file's modification time stands in for `fetched_at`.
    async fn adopt(&self, key: &CacheKey, policy: &FreshnessPolicy) -> Option<PathBuf> {
        {
            let state = self.inner.lock();
            if state.index.contains_key(key) || state.in_flight.contains_key(key) {
                return None;
            }
        }

        let _disk = self.inner.disk.read().await;
        let modified = self.inner.store.modified_at(key).await?;
        let path = self.inner.store.canonical_path(key);
        let entry = CacheEntry::ready(key.clone(), path, modified);

        let mut state = self.inner.lock();
        let entry = state.index.entry(key.clone()).or_insert(entry);
        entry
            .is_fresh(policy, SystemTime::now())
            .then(|| entry.path.clone())
    }

    /// Re-check the index, then attach to or create the key's in-flight request.
    fn join_or_start(&self, key: &CacheKey, policy: &FreshnessPolicy) -> Attach {
        let mut state = self.inner.lock();
        if let Some(entry) = state.index.get(key) {
            if entry.is_fresh(policy, SystemTime::now()) {
                return Attach::Fresh(entry.path.clone());
            }
        }
        if let Some(request) = state.in_flight.get(key) {
            return Attach::Joined(Arc::clone(request));
        }
        let request = Arc::new(InFlightRequest::new(key.clone()));
        state.in_flight.insert(key.clone(), Arc::clone(&request));
        Attach::Owner(request)
    }

    /// Run the fetch for `request` as its own task, so callers that stop
    /// waiting do not cancel it for the others.
    fn spawn_fetch(
        &self,
        request: Arc<InFlightRequest>,
        resource: ResourceId,
        options: FetchOptions,
    ) {
        let inner = Arc::clone(&self.inner);
        let key = request.key().clone();
        let guard = InFlightGuard::new(Arc::clone(&inner), request);
        tokio::spawn(async move {
            let started = Instant::now();
            let (outcome, disk) = fetch_and_promote(&inner, &key, &resource, &options).await;

            let status = if outcome.is_ok() { "ok" } else { "error" };
            metrics::counter!(telemetry::FETCHES_TOTAL, "status" => status).increment(1);
            metrics::histogram!(telemetry::FETCH_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());

            match &outcome {
                Ok(path) => info!(
                    key = %key,
                    url = %resource,
                    path = %path.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cached resource"
                ),
                Err(e) => warn!(key = %key, url = %resource, error = %e, "fetch failed"),
            }

            guard.settle(outcome);
            drop(disk);
        });
    }

    /// Whether a ready entry exists for the resource (indexed, or on disk
    /// from an earlier run). Never fetches.
    pub async fn is_cached(&self, identifier: &str, options: &FetchOptions) -> Result<bool> {
        let resource = ResourceId::parse(identifier)?;
        let key = self.inner.resolver.resolve(&resource, options);
        if self.inner.lock().index.contains_key(&key) {
            return Ok(true);
        }
        Ok(self.inner.store.modified_at(&key).await.is_some())
    }

    /// Current entry for the resource: ready if indexed, pending if a fetch
    /// is running, `None` otherwise.
    pub fn entry(&self, identifier: &str, options: &FetchOptions) -> Result<Option<CacheEntry>> {
        let resource = ResourceId::parse(identifier)?;
        let key = self.inner.resolver.resolve(&resource, options);
        let state = self.inner.lock();
        if let Some(entry) = state.index.get(&key) {
            return Ok(Some(entry.clone()));
        }
        Ok(state.in_flight.contains_key(&key).then(|| {
            let path = self.inner.store.canonical_path(&key);
            CacheEntry::pending(key, path)
        }))
    }

    /// Drop one resource from the index and disk.
    ///
    /// A fetch already running for it still completes and re-populates the
    /// entry. Returns whether anything was removed.
    pub async fn remove(&self, identifier: &str, options: &FetchOptions) -> Result<bool> {
        let resource = ResourceId::parse(identifier)?;
        let key = self.inner.resolver.resolve(&resource, options);

        let _disk = self.inner.disk.write().await;
        let indexed = self.inner.lock().index.remove(&key).is_some();
        let on_disk = self.inner.store.remove(&key).await?;
        if indexed || on_disk {
            info!(key = %key, url = %resource, "removed cache entry");
        }
        Ok(indexed || on_disk)
    }

    /// Remove every entry from the index and the cache directory.
    ///
    /// Waits for promotions in progress; fetches still downloading complete
    /// afterwards and re-populate their entries.
    pub async fn clear(&self) -> Result<()> {
        let _disk = self.inner.disk.write().await;
        let dropped = {
            let mut state = self.inner.lock();
            let n = state.index.len();
            state.index.clear();
            n
        };
        let removed = self.inner.store.clear().await?;
        info!(
            root = %self.root().display(),
            indexed = dropped,
            files = removed,
            "cleared cache"
        );
        Ok(())
    }

    /// Warm the cache for several resources concurrently, with default
    /// options. Results are in input order.
    pub async fn prefetch<I, S>(&self, identifiers: I) -> Vec<Result<PathBuf>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = FetchOptions::default();
        let identifiers: Vec<S> = identifiers.into_iter().collect();
        join_all(
            identifiers
                .iter()
                .map(|id| self.get(id.as_ref(), &options, false, None)),
        )
        .await
    }

    /// Index, in-flight and disk usage counts.
    pub async fn stats(&self) -> Result<CacheStats> {
        let (indexed, in_flight) = {
            let state = self.inner.lock();
            (state.index.len(), state.in_flight.len())
        };
        let disk = self.inner.store.usage().await?;
        Ok(CacheStats {
            indexed,
            in_flight,
            disk,
        })
    }
}

enum Attach {
    Fresh(PathBuf),
    Joined(Arc<InFlightRequest>),
    Owner(Arc<InFlightRequest>),
}

/// Download into scratch and promote. On success the shared `disk` guard is
/// returned still held, so the index update happens before any clear.
async fn fetch_and_promote(
    inner: &EngineInner,
    key: &CacheKey,
    resource: &ResourceId,
    options: &FetchOptions,
) -> (Result<PathBuf>, Option<tokio::sync::OwnedRwLockReadGuard<()>>) {
    if let Err(e) = inner.prepared.get_or_try_init(|| inner.store.prepare()).await {
        return (Err(e), None);
    }

    let body = match inner.fetcher.fetch(resource, options).await {
        Ok(body) => body,
        Err(e) => return (Err(e.into()), None),
    };
    let temp = match inner.store.write_temp(key, body).await {
        Ok(temp) => temp,
        Err(e) => return (Err(e), None),
    };

    let disk = Arc::clone(&inner.disk).read_owned().await;
    match inner.store.promote(&temp, key).await {
        Ok(path) => {
            metrics::counter!(telemetry::BYTES_WRITTEN_TOTAL).increment(temp.bytes);
            (Ok(path), Some(disk))
        }
        Err(e) => (Err(e), Some(disk)),
    }
}
