//! Fetch options passed alongside a resource identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Options forwarded to the [`Fetcher`](crate::fetch::Fetcher).
///
/// Headers are split in two groups. `headers` change what the remote returns
/// (authorization, content negotiation) and therefore take part in the cache
/// key. `fetch_only_headers` are sent with the request but never influence the
/// key, so two requests differing only there share one cache entry.
///
/// Header names are stored lowercased, whether added through the builder
/// methods or deserialised; the maps are ordered so key derivation does not
/// depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lowercase_names"
    )]
    headers: BTreeMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lowercase_names"
    )]
    fetch_only_headers: BTreeMap<String, String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key-affecting header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Add a header that is sent but does not affect the cache key.
    pub fn fetch_only_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.fetch_only_headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Key-affecting headers, names lowercased.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Headers sent without affecting the key, names lowercased.
    pub fn fetch_only_headers(&self) -> &BTreeMap<String, String> {
        &self.fetch_only_headers
    }

    /// Every header to send, key-affecting ones winning on name clashes.
    pub fn all_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fetch_only_headers
            .iter()
            .filter(|(name, _)| !self.headers.contains_key(*name))
            .chain(self.headers.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn lowercase_names<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_lowercased() {
        let opts = FetchOptions::new()
            .header("Authorization", "Bearer t")
            .fetch_only_header("X-Request-Id", "42");
        assert_eq!(opts.headers().get("authorization").unwrap(), "Bearer t");
        assert_eq!(opts.fetch_only_headers().get("x-request-id").unwrap(), "42");
    }

    #[test]
    fn key_affecting_header_wins_on_clash() {
        let opts = FetchOptions::new()
            .fetch_only_header("Accept", "*/*")
            .header("accept", "image/webp");
        let all: Vec<_> = opts.all_headers().collect();
        assert_eq!(all, vec![("accept", "image/webp")]);
    }

    #[test]
    fn deserialises_with_missing_groups() {
        let opts: FetchOptions = serde_json::from_str(r#"{"headers":{"accept":"image/png"}}"#).unwrap();
        assert_eq!(opts.headers().len(), 1);
        assert!(opts.fetch_only_headers().is_empty());
    }

    #[test]
    fn deserialised_header_names_are_lowercased() {
        let opts: FetchOptions = serde_json::from_str(
            r#"{"headers":{"Authorization":"x"},"fetch_only_headers":{"ACCEPT":"*/*","X-Trace":"1"}}"#,
        )
        .unwrap();
        assert_eq!(
            opts,
            FetchOptions::new()
                .header("authorization", "x")
                .fetch_only_header("accept", "*/*")
                .fetch_only_header("x-trace", "1")
        );
    }

    #[test]
    fn deserialised_clash_is_sent_once() {
        let opts: FetchOptions = serde_json::from_str(
            r#"{"headers":{"Accept":"image/webp"},"fetch_only_headers":{"accept":"*/*"}}"#,
        )
        .unwrap();
        let all: Vec<_> = opts.all_headers().collect();
        assert_eq!(all, vec![("accept", "image/webp")]);
    }
}
