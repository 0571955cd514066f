//! Retry configuration, delay calculation, and the retrying fetch decorator.
//!
//! The cache engine never retries on its own. [`RetryingFetcher`] is an
//! opt-in wrapper around the fetch capability for deployments that want
//! transient failures (timeouts, 5xx, 429) retried before they are reported.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::{ByteStream, Fetcher};
use crate::error::FetchError;
use crate::telemetry;
use crate::types::{FetchOptions, ResourceId};

/// Configuration for retry behaviour on transient fetch errors.
///
/// Uses exponential backoff:
///
/// ```rust
/// # use hoard::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-indexed):
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Decorator that wraps a [`Fetcher`] with retry logic.
///
/// Only the initial request is retried. Once a body stream has been handed
/// out, mid-stream failures are reported as-is.
pub struct RetryingFetcher {
    inner: Arc<dyn Fetcher>,
    config: RetryConfig,
}

impl RetryingFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Fetcher for RetryingFetcher {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(
        &self,
        resource: &ResourceId,
        options: &FetchOptions,
    ) -> Result<ByteStream, FetchError> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.inner.fetch(resource, options).await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "fetcher" => self.inner.name().to_owned(),
                    )
                    .increment(1);
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        fetcher = self.inner.name(),
                        url = %resource,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
