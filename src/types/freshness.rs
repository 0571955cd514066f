//! Per-request freshness policy.

use std::time::{Duration, SystemTime};

/// How an existing entry is judged when a request arrives.
///
/// Derived per call by [`FreshnessPolicy::resolve`] from, highest priority
/// first: the bypass flag, the request's `max_age`, then the engine default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    /// Always refetch.
    Bypass,
    /// Serve entries fetched at most this long ago. Zero always refetches.
    MaxAge(Duration),
    /// Serve any ready entry; only an explicit clear or remove expires it.
    Indefinite,
}

impl FreshnessPolicy {
    pub fn resolve(
        bypass_cache: bool,
        max_age: Option<Duration>,
        default_max_age: Option<Duration>,
    ) -> Self {
        if bypass_cache {
            return FreshnessPolicy::Bypass;
        }
        match max_age.or(default_max_age) {
            Some(max) => FreshnessPolicy::MaxAge(max),
            None => FreshnessPolicy::Indefinite,
        }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self, FreshnessPolicy::Bypass)
    }

    /// Whether something written at `fetched_at` may be served at `now`.
    ///
    /// Timestamps in the future (clock stepped backwards) count as age zero.
    pub fn is_fresh(&self, fetched_at: SystemTime, now: SystemTime) -> bool {
        match self {
            FreshnessPolicy::Bypass => false,
            FreshnessPolicy::Indefinite => true,
            FreshnessPolicy::MaxAge(max) if max.is_zero() => false,
            FreshnessPolicy::MaxAge(max) => {
                let age = now.duration_since(fetched_at).unwrap_or(Duration::ZERO);
                age <= *max
            }
        }
    }
}
