//! Injected JSON-fetch capability.
//!
//! The resolver never talks HTTP directly; it goes through [`JsonFetcher`]
//! so tests can script responses and deployments can swap the transport.
//! [`HttpFetcher`] is the default reqwest-backed implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Fetches a URL and returns its body as parsed JSON.
///
/// Transport concerns (timeouts, TLS, redirects) belong to the
/// implementation, not to the resolver.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

/// HTTP implementation of [`JsonFetcher`] backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;

        let body = response
            .json::<Value>()
            .await
            .with_context(|| format!("GET {url} returned a non-JSON body"))?;

        Ok(body)
    }
}
