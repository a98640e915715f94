//! Outgoing network pipeline.
//!
//! The [`Network`] trait is the seam between the strategies and the
//! transport: the worker wires in [`NetClient`], tests wire in scripted
//! fakes. A transport-level failure (no connectivity, DNS failure,
//! connection refused, or a configured timeout firing) maps to
//! [`Error::NetworkUnreachable`]; a reachable server returning any status
//! is a successful fetch.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

use vendavoa_core::{Error, ResponseSnapshot, WorkerRequest};

/// Configuration for the network client.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// User agent string (default: "vendavoa-worker/0.1")
    pub user_agent: String,

    /// Request timeout. The source worker let hanging requests hang, so
    /// the default is None; set it to opt in to bounded waits.
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self { user_agent: "vendavoa-worker/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

/// Transport seam used by the caching strategies.
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue the request and snapshot the full response.
    async fn fetch(&self, request: &WorkerRequest) -> Result<ResponseSnapshot, Error>;
}

/// HTTP network client backed by reqwest.
pub struct NetClient {
    http: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client with the given configuration.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &NetConfig {
        &self.config
    }
}

#[async_trait]
impl Network for NetClient {
    async fn fetch(&self, request: &WorkerRequest) -> Result<ResponseSnapshot, Error> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut outgoing = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            outgoing = outgoing.header(name.as_str(), value.as_str());
        }

        let response = outgoing
            .send()
            .await
            .map_err(|e| Error::NetworkUnreachable(e.to_string()))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let content_type = headers
            .iter()
            .find(|(name, _)| name == "content-type")
            .map(|(_, value)| value.clone());

        // Body must be snapshotted here: the transport stream is single-use,
        // and both the cache and the caller need their own copy.
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnreachable(format!("failed to read response body: {e}")))?;

        tracing::debug!(
            "fetched {} -> {} ({} bytes, status {})",
            request.url,
            final_url,
            body.len(),
            status
        );

        Ok(ResponseSnapshot {
            status,
            content_type,
            headers,
            body,
            url: request.url.to_string(),
            final_url,
            fetched_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
    }
}
