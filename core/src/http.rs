//! HTTP transport for the API endpoint.
//!
//! # Design
//! Requests and responses are plain data. `ApiClient` builds `HttpRequest`
//! values and parses `HttpResponse` values without touching the network;
//! a `Transport` performs the round-trip in between. `UreqTransport` is the
//! blocking implementation used by `MediaWiki`; tests swap in recording
//! transports without a server.

use std::time::Duration;

use ureq::http::StatusCode;

use crate::error::{MediaWikiError, Result};

/// An HTTP POST request described as plain data.
///
/// MediaWiki accepts every action as a form-encoded POST to a single
/// endpoint, so the method is implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A 200 response with `body`, mostly useful in tests.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Executes one request and returns whatever the server answered.
///
/// Implementations return non-2xx responses as data; only failures that
/// produce no response at all become `MediaWikiError::Request`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent keeps a cookie store, which the login handshake relies on:
/// MediaWiki ties the `NeedToken` token to the session cookie of the
/// first request.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// `timeout` bounds each whole call; `None` keeps ureq's defaults.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.agent.post(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(MediaWikiError::request)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(MediaWikiError::request)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map anything but 200 to `MediaWikiError::Http`.
///
/// Status codes outside [100, 999] cannot come from a real server and are
/// reported as a malformed response.
pub fn check_status(response: &HttpResponse) -> Result<()> {
    if response.status == 200 {
        return Ok(());
    }
    let status = StatusCode::from_u16(response.status).map_err(|_| {
        MediaWikiError::MalformedResponse(format!("invalid HTTP status {}", response.status))
    })?;
    Err(MediaWikiError::Http {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}
