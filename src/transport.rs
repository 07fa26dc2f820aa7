//! Shared HTTP transport
//!
//! [`TransportPool`] owns one pooled `reqwest::Client` for the whole batch. The
//! client is built lazily on the first request, reused by every task, and
//! dropped by [`TransportPool::close`]. Retry and classification logic only
//! sees the [`Transport`] trait, so tests can substitute a scripted fake.

use crate::config::Config;
use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A fully read HTTP response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Complete response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Value of the `Content-Type` header, if present and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Transport-level failure of a single GET
///
/// Every variant is transient from the retry controller's point of view and
/// becomes `NetworkError` once the retry budget is spent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request exceeded the total timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// DNS resolution, TCP connect or TLS handshake failed
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be sent or the response was malformed
    #[error("request failed: {0}")]
    Request(String),

    /// The connection broke while reading the body
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The shared client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Something that can perform a GET and return the complete response
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`, reading the whole body
    async fn get(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError>;

    /// Release pooled connections; the default does nothing
    async fn close(&self) {}
}

/// Lazily created, pooled HTTP client shared by every task of a batch
pub struct TransportPool {
    headers: HeaderMap,
    user_agent: String,
    timeout: Duration,
    pool_size: usize,
    client: tokio::sync::Mutex<Option<reqwest::Client>>,
}

impl TransportPool {
    /// Prepare a pool from the downloader configuration
    ///
    /// No sockets are opened until the first request.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.artifact.accept_header())
                .map_err(|e| Error::config("artifact.media_types", e.to_string()))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| Error::config("accept_language", e.to_string()))?,
        );
        HeaderValue::from_str(&config.user_agent)
            .map_err(|e| Error::config("user_agent", e.to_string()))?;

        Ok(Self {
            headers,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
            pool_size: config.max_concurrency,
            client: tokio::sync::Mutex::new(None),
        })
    }

    /// The shared client, building it on first use
    async fn client(&self) -> std::result::Result<reqwest::Client, TransportError> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(self.headers.clone())
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_size)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        tracing::debug!(pool_size = self.pool_size, "Created shared HTTP client");
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Whether the shared client currently exists
    pub async fn is_open(&self) -> bool {
        self.client.lock().await.is_some()
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Transport for TransportPool {
    async fn get(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError> {
        let client = self.client().await?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        tracing::debug!(%url, status, bytes = body.len(), "GET completed");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Drop the shared client and its idle connections
    ///
    /// Requests already in progress keep their own handle and finish normally.
    /// A later request builds a fresh client.
    async fn close(&self) {
        if self.client.lock().await.take().is_some() {
            tracing::debug!("Closed shared HTTP client");
        }
    }
}
