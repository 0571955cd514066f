//! The fetch capability consumed by the cache engine.
//!
//! The engine never talks to the network itself. It asks a [`Fetcher`] for a
//! byte stream and treats any error as opaque: the outcome is reported to
//! callers as [`HoardError::FetchFailed`](crate::HoardError::FetchFailed) and
//! nothing is retried at the engine level.
//!
//! # Example
//!
//! ```ignore
//! struct StaticFetcher(&'static [u8]);
//!
//! #[async_trait]
//! impl Fetcher for StaticFetcher {
//!     fn name(&self) -> &str { "static" }
//!
//!     async fn fetch(&self, _: &ResourceId, _: &FetchOptions) -> Result<ByteStream, FetchError> {
//!         Ok(Box::pin(futures_util::stream::once(async { Ok(Bytes::from_static(self.0)) })))
//!     }
//! }
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::error::FetchError;
use crate::types::{FetchOptions, ResourceId};

/// Body of a successful fetch, delivered in chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// Source of remote bytes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetcher name for logging/debugging.
    fn name(&self) -> &str;

    /// Start downloading `resource`.
    ///
    /// Returns once the remote has accepted the request (e.g. a 2xx status
    /// was received). Failures after that point surface as `Err` items on
    /// the stream.
    async fn fetch(
        &self,
        resource: &ResourceId,
        options: &FetchOptions,
    ) -> Result<ByteStream, FetchError>;
}
