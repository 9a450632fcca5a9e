//! Configuration consumed by [`HTTPTransport`](super::HTTPTransport).
//!
//! `HTTPHandlerBuilder` constructs these values before passing them to the
//! transport for runtime use.

use std::time::Duration;

use crate::encoder::PayloadFormat;
use crate::endpoint::{DEFAULT_HTTPS_PORT, Endpoint};
use crate::tls::TlsOptions;

/// Default timeout for establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for writing the request and reading the reply.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP methods supported by the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HTTPMethod {
    /// Payload appended to the URL query string.
    #[default]
    GET,
    /// Payload sent as the request body.
    POST,
}

impl HTTPMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
        }
    }
}

impl std::str::FromStr for HTTPMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::GET),
            "POST" => Ok(Self::POST),
            other => Err(format!("method must be GET or POST, got {other:?}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HTTPHandlerConfig {
    pub endpoint: Endpoint,
    /// Request target, e.g. `/log` or `/ingest?source=app`.
    pub url: String,
    /// Configured method. JSON payloads are always POSTed.
    pub method: HTTPMethod,
    pub format: PayloadFormat,
    /// TLS settings; `None` uses plain HTTP.
    pub tls: Option<TlsOptions>,
    pub connect_timeout: Option<Duration>,
    pub io_timeout: Option<Duration>,
}

impl Default for HTTPHandlerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("localhost", DEFAULT_HTTPS_PORT),
            url: "/".into(),
            method: HTTPMethod::default(),
            format: PayloadFormat::default(),
            tls: Some(TlsOptions::strict(true)),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

impl HTTPHandlerConfig {
    /// Method actually used on the wire.
    pub fn effective_method(&self) -> HTTPMethod {
        match self.format {
            PayloadFormat::Json => HTTPMethod::POST,
            PayloadFormat::UrlEncoded => self.method,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.tls.is_some()
    }

    /// Absolute URL of the request target.
    pub fn target_url(&self) -> String {
        let scheme = if self.is_secure() { "https" } else { "http" };
        let separator = if self.url.starts_with('/') { "" } else { "/" };
        format!(
            "{scheme}://{}:{}{separator}{}",
            self.endpoint.url_host(),
            self.endpoint.port,
            self.url
        )
    }
}

/// Append `query` to `url`, continuing an existing query string if present.
pub fn append_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}
