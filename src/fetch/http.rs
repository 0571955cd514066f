//! HTTP fetcher backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use super::traits::{ByteStream, Fetcher};
use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::types::{FetchOptions, ResourceId};
use crate::{HoardError, Result};

/// Default [`Fetcher`]: a plain `GET` streaming the response body.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            HoardError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        resource: &ResourceId,
        options: &FetchOptions,
    ) -> std::result::Result<ByteStream, FetchError> {
        let mut request = self.client.get(resource.url().clone());
        for (name, value) in options.all_headers() {
            request = request.header(name, value);
        }

        debug!(url = %resource, "fetching resource");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %resource, status = status.as_u16(), "remote rejected request");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: resource.to_string(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| FetchError::Stream(e.to_string())));
        Ok(Box::pin(body))
    }
}
