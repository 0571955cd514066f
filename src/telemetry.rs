//! Telemetry metric name constants.
//!
//! Centralised metric names for hoard operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `hoard_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).

/// Requests served straight from the index.
pub const CACHE_HITS_TOTAL: &str = "hoard_cache_hits_total";

/// Requests that had to go through the in-flight path (missing, stale or bypassed).
pub const CACHE_MISSES_TOTAL: &str = "hoard_cache_misses_total";

/// Callers that attached to a fetch already running for their key.
pub const INFLIGHT_JOINS_TOTAL: &str = "hoard_inflight_joins_total";

/// Fetches started by the engine.
///
/// Labels: `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "hoard_fetches_total";

/// Fetch duration in seconds, from first request byte to promotion.
pub const FETCH_DURATION_SECONDS: &str = "hoard_fetch_duration_seconds";

/// Bytes written to canonical paths.
pub const BYTES_WRITTEN_TOTAL: &str = "hoard_bytes_written_total";

/// Retry attempts made by [`RetryingFetcher`](crate::fetch::RetryingFetcher)
/// (not counting the initial request).
pub const RETRIES_TOTAL: &str = "hoard_retries_total";
