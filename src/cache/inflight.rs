//! In-flight request coordination.
//!
//! Every key with a running fetch has exactly one [`InFlightRequest`] in the
//! engine's in-flight set. Callers that find one attach to it and wait on its
//! outcome channel; the fetch task owns an [`InFlightGuard`] that publishes
//! the outcome and removes the request from the set exactly once, including
//! when the task panics or is dropped by a shutting-down runtime.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::FetchError;
use crate::key::CacheKey;
use crate::types::EntryState;
use crate::{HoardError, Result};

type Outcome = Option<Result<PathBuf>>;

/// Shared handle for one running fetch.
#[derive(Debug)]
pub struct InFlightRequest {
    key: CacheKey,
    outcome: watch::Sender<Outcome>,
}

impl InFlightRequest {
    pub(crate) fn new(key: CacheKey) -> Self {
        let (outcome, _) = watch::channel(None);
        Self { key, outcome }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// `Pending` until settled, then `Ready` or `Failed`.
    pub fn state(&self) -> EntryState {
        match &*self.outcome.borrow() {
            None => EntryState::Pending,
            Some(Ok(_)) => EntryState::Ready,
            Some(Err(_)) => EntryState::Failed,
        }
    }

    /// Wait for the fetch to settle. Every waiter receives the same outcome.
    pub async fn wait(&self) -> Result<PathBuf> {
        let mut rx = self.outcome.subscribe();
        let settled = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| HoardError::from(FetchError::Aborted))?;
        settled
            .clone()
            .unwrap_or_else(|| Err(FetchError::Aborted.into()))
    }

    fn publish(&self, outcome: Result<PathBuf>) {
        self.outcome.send_replace(Some(outcome));
    }
}

/// Removal hook the guard calls to take the request out of the in-flight set.
pub(crate) trait InFlightSet: Send + Sync {
    /// Remove `request` (compared by identity) from the set. When `promoted`
    /// is `Some`, record the key as ready at that path in the same critical
    /// section.
    fn settle(&self, request: &Arc<InFlightRequest>, promoted: Option<&PathBuf>);
}

/// Owned by the fetch task; settles the request exactly once.
pub(crate) struct InFlightGuard<S: InFlightSet> {
    set: Arc<S>,
    request: Arc<InFlightRequest>,
    settled: bool,
}

impl<S: InFlightSet> InFlightGuard<S> {
    pub fn new(set: Arc<S>, request: Arc<InFlightRequest>) -> Self {
        Self {
            set,
            request,
            settled: false,
        }
    }

    /// Update the set, then release every waiter with `outcome`.
    pub fn settle(mut self, outcome: Result<PathBuf>) {
        self.set.settle(&self.request, outcome.as_ref().ok());
        self.request.publish(outcome);
        self.settled = true;
    }
}

impl<S: InFlightSet> Drop for InFlightGuard<S> {
    fn drop(&mut self) {
        if !self.settled {
            self.set.settle(&self.request, None);
            self.request.publish(Err(FetchError::Aborted.into()));
        }
    }
}
