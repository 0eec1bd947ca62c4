//! Network boundary of the tiered cache.
//!
//! ### Requests and responses
//! - `Request` carries what the routing rules look at: method, absolute
//!   URL, declared destination and whether it is a page navigation.
//! - `Response` mirrors browser fetch semantics: any HTTP status is a
//!   response; only transport failures are errors.
//!
//! ### Network implementations
//! - `HttpNetwork`: reqwest-backed, with timeout, redirect and body-size limits.
//! - `ScriptedNetwork`: canned answers for offline runs and tests.

pub mod scripted;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use serde::Serialize;
use std::time::{Duration, Instant};

pub use scripted::{RecordedCall, ScriptedNetwork};
pub use self::url::{UrlError, canonicalize, resolve};

use hypernews_core::{AppConfig, Error, StoredResponse, cache::hash::request_key};

/// What the request will be used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Destination {
    #[default]
    Other,
    Document,
    Image,
    Audio,
}

/// How the request was initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    #[default]
    SameOrigin,
    /// Top-level page navigation; eligible for the offline page.
    Navigate,
}

/// An outgoing request as seen by the cache.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: ::url::Url,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn get(url: ::url::Url) -> Self {
        Self {
            method: Method::GET,
            url,
            destination: Destination::Other,
            mode: RequestMode::SameOrigin,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A top-level page navigation.
    pub fn navigation(url: ::url::Url) -> Self {
        Self { destination: Destination::Document, mode: RequestMode::Navigate, ..Self::get(url) }
    }

    /// A POST carrying a JSON body.
    pub fn post_json(url: ::url::Url, body: &impl Serialize) -> Result<Self, Error> {
        let body = serde_json::to_vec(body).map_err(|e| Error::InvalidInput(format!("unserializable body: {e}")))?;
        Ok(Self {
            method: Method::POST,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(Bytes::from(body)),
            ..Self::get(url)
        })
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity of the request inside a partition.
    pub fn cache_key(&self) -> String {
        request_key(self.method.as_str(), self.url.as_str())
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built locally because neither network nor cache could answer.
    Synthetic,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// Locally built response.
    pub fn synthetic(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
            headers: Vec::new(),
            body: body.into(),
            source: ResponseSource::Synthetic,
        }
    }

    pub fn from_stored(stored: StoredResponse) -> Self {
        Self {
            status: stored.status,
            content_type: stored.content_type,
            headers: stored.headers,
            body: Bytes::from(stored.body),
            source: ResponseSource::Cache,
        }
    }

    pub fn to_stored(&self) -> StoredResponse {
        StoredResponse::new(self.status, self.content_type.clone(), self.headers.clone(), self.body.to_vec())
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything that can carry a request to the backend.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. HTTP error statuses are `Ok`; only transport
    /// failures (offline, timeout, oversized body) are `Err`.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "hypernews-eco/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "hypernews-eco/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn transport_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::HttpError(format!("network error: {err}")) }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(request.method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await.map_err(|e| transport_error(&e))?;
        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch"
        );

        Ok(Response { status: status.as_u16(), content_type, headers, body, source: ResponseSource::Network })
    }
}
