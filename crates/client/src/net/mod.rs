//! HTTP transport seam and the observing decorator.
//!
//! The page's networking primitives collapse onto one [`Transport`] trait:
//! callers issue requests through it exactly as they would through the plain
//! HTTP client, and interception is layered on as a decorator that forwards
//! everything unchanged. See [`observer`] for the decorator and [`filter`]
//! for the admission rules.

pub mod filter;
pub mod observer;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};

use capsift_core::Error;

pub use observer::ObservedTransport;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent string (default: "capsift/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: "capsift/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20_000),
        }
    }
}

/// An outgoing request as seen at the transport seam.
#[derive(Debug, Clone)]
pub struct Request {
    /// Absolute request URL.
    pub url: String,
    /// Optional Accept header override.
    pub accept: Option<String>,
}

impl Request {
    /// A plain GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), accept: None }
    }
}

/// A completed response as seen at the transport seam.
#[derive(Debug, Clone)]
pub struct Response {
    /// The original URL requested.
    pub url: Url,
    /// The final URL after redirects.
    pub final_url: Url,
    /// HTTP status code.
    pub status: StatusCode,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response body bytes.
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds.
    pub fetch_ms: u64,
}

impl Response {
    /// Body as lossily decoded text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }
}

/// The networking seam both halves of the system share.
///
/// Implementations must behave identically whether or not an observer is
/// layered on top; decorators forward requests and responses unchanged.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request to completion.
    async fn execute(&self, request: &Request) -> Result<Response, Error>;
}

/// Plain reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchTimeout(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let url = Url::parse(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut req = self.http.get(url.as_str());
        if let Some(accept) = &request.accept {
            req = req.header(header::ACCEPT, accept);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("network error: {}", e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(Response { url, final_url, status, content_type, bytes, fetch_ms })
    }
}
