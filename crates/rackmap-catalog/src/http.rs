//! HTTP client for the catalog service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::cache::{CachePolicy, ResponseCache};
use crate::error::{CatalogError, Result};

/// Connection settings for a [`CatalogClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Bearer credential sent with every request
    pub token: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Verify TLS certificates
    pub validate_certs: bool,
    /// Cache lifetime; `None` disables the response cache
    pub cache_ttl: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            token: String::new(),
            timeout: Duration::from_secs(60),
            validate_certs: true,
            cache_ttl: None,
        }
    }
}

/// One authenticated GET returning decoded JSON.
///
/// The production implementation is [`CatalogClient`]; tests substitute a
/// scripted transport.
#[async_trait]
pub trait CatalogFetch: Send + Sync {
    async fn fetch(&self, url: &str, policy: CachePolicy) -> Result<Value>;
}

/// HTTP client for the catalog service
///
/// Auth, timeout and TLS settings are fixed at construction; the optional
/// response cache is shared by every fetch through this client.
#[derive(Debug)]
pub struct CatalogClient {
    client: Client,
    cache: Option<ResponseCache>,
}

impl CatalogClient {
    /// Create a new catalog client
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", options.token);
        let mut auth = HeaderValue::from_str(&auth)
            .map_err(|e| CatalogError::Config(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.validate_certs)
            .build()?;

        Ok(Self {
            client,
            cache: options.cache_ttl.map(ResponseCache::new),
        })
    }

    /// Create a client around a preconfigured `reqwest::Client`
    #[must_use]
    pub fn with_client(client: Client, cache_ttl: Option<Duration>) -> Self {
        Self {
            client,
            cache: cache_ttl.map(ResponseCache::new),
        }
    }

    async fn get(&self, url: &str) -> Result<Value> {
        debug!(%url, "fetching");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api { status, message });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogFetch for CatalogClient {
    async fn fetch(&self, url: &str, policy: CachePolicy) -> Result<Value> {
        if url.is_empty() {
            return Err(CatalogError::EmptyUrl);
        }

        if policy.read
            && let Some(cache) = &self.cache
            && let Some(payload) = cache.get(url).await
        {
            return Ok(payload);
        }

        let payload = self.get(url).await?;

        if policy.write
            && let Some(cache) = &self.cache
        {
            cache.put(url, payload.clone()).await;
        }

        Ok(payload)
    }
}
