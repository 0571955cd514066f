//! Builder for configuring cache engines

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::CacheEngine;
use crate::config::{CacheConfig, HttpConfig};
use crate::fetch::{Fetcher, RetryConfig, RetryingFetcher};
use crate::Result;

/// Main entry point for creating cache engines.
pub struct Hoard;

impl Hoard {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> HoardBuilder {
        HoardBuilder::new()
    }
}

/// Builder for configuring cache engines.
///
/// ```rust,no_run
/// # use hoard::Hoard;
/// # use std::time::Duration;
/// # fn main() -> hoard::Result<()> {
/// let engine = Hoard::builder()
///     .cache_dir("/tmp/hoard")
///     .default_max_age(Duration::from_secs(7 * 24 * 3600))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HoardBuilder {
    cache_dir: Option<PathBuf>,
    default_max_age: Option<Duration>,
    fetcher: Option<Arc<dyn Fetcher>>,
    http: HttpConfig,
    retry: Option<RetryConfig>,
}

impl HoardBuilder {
    pub fn new() -> Self {
        Self {
            cache_dir: None,
            default_max_age: None,
            fetcher: None,
            http: HttpConfig::default(),
            retry: None,
        }
    }

    /// Start from a loaded [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut builder = Self::new()
            .cache_dir(config.cache_dir.clone())
            .http(config.http.clone());
        builder.default_max_age = config.default_max_age();
        if config.retry.is_enabled() {
            builder = builder.retry(config.retry.to_retry_config());
        }
        builder
    }

    /// Set the cache root directory (default: [`CacheConfig::default`]'s).
    ///
    /// Build one engine per root and share it by cloning. A second engine on
    /// the same root does not see the first one's index or in-flight set, so
    /// the same key may be downloaded twice. Scratch files of other processes
    /// are swept when an engine starts its first download.
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Maximum age used when a request carries none. Without this, entries
    /// stay fresh until cleared.
    pub fn default_max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age = Some(max_age);
        self
    }

    /// Use a custom fetch capability instead of the built-in HTTP fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Settings for the built-in HTTP fetcher. Ignored when a custom
    /// fetcher is set.
    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Retry transient fetch failures before reporting them.
    ///
    /// Wraps whichever fetcher ends up being used in a [`RetryingFetcher`].
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    pub fn build(self) -> Result<CacheEngine> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => default_fetcher(&self.http)?,
        };
        let fetcher: Arc<dyn Fetcher> = match self.retry {
            Some(retry) if retry.max_attempts > 1 => Arc::new(RetryingFetcher::new(fetcher, retry)),
            _ => fetcher,
        };
        let cache_dir = self
            .cache_dir
            .unwrap_or_else(|| CacheConfig::default().cache_dir);

        Ok(CacheEngine::new(cache_dir, fetcher, self.default_max_age))
    }
}

impl Default for HoardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
fn default_fetcher(http: &HttpConfig) -> Result<Arc<dyn Fetcher>> {
    Ok(Arc::new(crate::fetch::HttpFetcher::new(http)?))
}

#[cfg(not(feature = "http"))]
fn default_fetcher(_http: &HttpConfig) -> Result<Arc<dyn Fetcher>> {
    Err(crate::HoardError::Configuration(
        "no fetcher configured (enable the `http` feature or call `.fetcher()`)".to_string(),
    ))
}
