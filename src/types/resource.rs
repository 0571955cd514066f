//! Remote resource identifiers.

use std::fmt;
use std::path::Path;

use url::Url;

use crate::{HoardError, Result};

/// Address of a remote asset the cache may fetch.
///
/// Only absolute `http` / `https` URLs with a host are accepted. Local files
/// and bundled assets never reach the cache engine; callers resolve those
/// themselves (see [`is_remote_resource`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    url: Url,
}

impl ResourceId {
    /// Parse and validate an identifier.
    pub fn parse(identifier: &str) -> Result<Self> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Err(HoardError::InvalidResource("empty identifier".to_string()));
        }
        let url = Url::parse(trimmed)
            .map_err(|e| HoardError::InvalidResource(format!("{trimmed}: {e}")))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(HoardError::InvalidResource(format!(
                    "{trimmed}: unsupported scheme '{other}'"
                )));
            }
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(HoardError::InvalidResource(format!("{trimmed}: missing host")));
        }
        Ok(Self { url })
    }

    /// The normalised URL string (as sent on the wire and hashed into keys).
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lowercased file extension of the last path segment, if it looks like one.
    ///
    /// At most five ASCII alphanumerics, so the result is always safe to
    /// append to a file name.
    pub fn extension(&self) -> Option<String> {
        let segment = self.url.path_segments()?.next_back()?;
        let (stem, ext) = segment.rsplit_once('.')?;
        if stem.is_empty()
            || ext.is_empty()
            || ext.len() > 5
            || !ext.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Whether `identifier` names something the cache engine can fetch.
///
/// Presentation layers use this to route local/bundled assets around the
/// cache entirely.
pub fn is_remote_resource(identifier: &str) -> bool {
    ResourceId::parse(identifier).is_ok()
}

/// `file://` URI for a cached path, for consumers that need a URI rather than a path.
///
/// Returns `None` for relative paths.
pub fn file_uri(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(ResourceId::parse("https://example.com/a.png").is_ok());
        assert!(ResourceId::parse("http://example.com/a.png").is_ok());
    }

    #[test]
    fn rejects_non_remote_identifiers() {
        for bad in [
            "",
            "   ",
            "file:///tmp/a.png",
            "/data/user/0/app/a.png",
            "data:image/png;base64,AAAA",
            "asset://logo.png",
        ] {
            let err = ResourceId::parse(bad).unwrap_err();
            assert!(
                matches!(err, HoardError::InvalidResource(_)),
                "expected InvalidResource for {bad:?}"
            );
        }
    }

    #[test]
    fn extension_is_sanitised() {
        let ext = |s: &str| ResourceId::parse(s).unwrap().extension();
        assert_eq!(ext("https://x/a.PNG").as_deref(), Some("png"));
        assert_eq!(ext("https://x/photo.jpeg?size=large").as_deref(), Some("jpeg"));
        assert_eq!(ext("https://x/a"), None);
        assert_eq!(ext("https://x/.hidden"), None);
        assert_eq!(ext("https://x/a.toolongext"), None);
        assert_eq!(ext("https://x/a.p%20g"), None);
        assert_eq!(ext("https://x/"), None);
    }

    #[test]
    fn remote_resource_helper() {
        assert!(is_remote_resource("https://cdn.example.com/img/1.webp"));
        assert!(!is_remote_resource("require('./logo.png')"));
    }

    #[test]
    fn file_uri_for_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.png");
        let uri = file_uri(&path).unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("abc.png"));
        assert!(file_uri(Path::new("relative/abc.png")).is_none());
    }
}
