//! Configuration file loading and builder wiring.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use hoard::{
    ByteStream, CacheConfig, FetchError, FetchOptions, Fetcher, HoardBuilder, HoardError,
    ResourceId,
};

#[derive(Default)]
struct OkFetcher {
    calls: AtomicU32,
}

#[async_trait]
impl Fetcher for OkFetcher {
    fn name(&self) -> &str {
        "ok"
    }

    async fn fetch(
        &self,
        _resource: &ResourceId,
        _options: &FetchOptions,
    ) -> Result<ByteStream, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(futures_util::stream::iter(vec![Ok::<_, FetchError>(
            Bytes::from_static(b"data"),
        )])))
    }
}

#[test]
fn config_file_sets_cache_dir_and_max_age() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("images");
    let path = dir.path().join("hoard.toml");
    std::fs::write(
        &path,
        format!(
            "cache_dir = {:?}\ndefault_max_age_secs = 3600\n\n[retry]\nmax_attempts = 2\n",
            cache_dir.display().to_string()
        ),
    )
    .unwrap();

    let config = CacheConfig::load(Some(&path)).unwrap();
    assert_eq!(config.cache_dir, cache_dir);
    assert_eq!(config.default_max_age(), Some(Duration::from_secs(3600)));
    assert_eq!(config.retry.to_retry_config().max_attempts, 2);
}

#[test]
fn wrong_value_type_is_rejected() {
    let err = CacheConfig::from_toml_str("[http]\nconnect_timeout_secs = \"ten\"\n").unwrap_err();
    assert!(matches!(err, HoardError::Configuration(_)));
}

#[test]
fn malformed_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "cache_dir = \n").unwrap();

    let err = CacheConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, HoardError::Configuration(_)));
    assert!(err.to_string().contains("broken.toml"));
}

#[tokio::test]
async fn engine_from_config_uses_configured_root_and_max_age() {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig::from_toml_str(&format!(
        "cache_dir = {:?}\ndefault_max_age_secs = 0\n",
        dir.path().display().to_string()
    ))
    .unwrap();

    let fetcher = Arc::new(OkFetcher::default());
    let cache = HoardBuilder::from_config(&config)
        .fetcher(fetcher.clone())
        .build()
        .unwrap();
    assert_eq!(cache.root(), dir.path());

    let opts = FetchOptions::default();
    let path = cache
        .get("https://example.com/a.webp", &opts, false, None)
        .await
        .unwrap();
    assert!(path.starts_with(dir.path()));

    // A zero default max age makes every entry stale.
    cache
        .get("https://example.com/a.webp", &opts, false, None)
        .await
        .unwrap();
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().await.unwrap().disk.files, 1);
}
