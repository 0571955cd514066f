//! Fetch capability: the trait, the HTTP implementation, and decorators.

#[cfg(feature = "http")]
pub mod http;
pub mod retry;
pub mod traits;

#[cfg(feature = "http")]
pub use http::HttpFetcher;
pub use retry::{RetryConfig, RetryingFetcher};
pub use traits::{ByteStream, Fetcher};
