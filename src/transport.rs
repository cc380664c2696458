//! The seam between the typed API and the wire.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};

use crate::config::Config;
use crate::error::{Error, Result};

/// A fully resolved request, ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Path segments relative to the API base, unescaped.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// The path for display, e.g. `/votes/verify/abc`. Not escaped.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// A raw response: status plus body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can carry an [`HttpRequest`] to the backend.
///
/// An `Err` means the request never completed; HTTP error statuses are successful
/// transports and come back as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// The production transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(config.api_url())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::Validation(format!("Invalid API URL '{}'", config.api_url())))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url,
            timeout: config.request_timeout(),
        })
    }

    /// The full URL for `segments`, each one percent-encoded as a single path segment.
    fn url(&self, segments: &[String]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Validation(format!("Invalid API URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.url(&request.segments)?;
        let mut builder = self.http.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let timeout = self.timeout;
        let to_error = |err: reqwest::Error| {
            if err.is_timeout() {
                Error::Timeout(timeout)
            } else {
                Error::from(err)
            }
        };

        let response = builder.send().await.map_err(to_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(to_error)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
