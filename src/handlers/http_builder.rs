//! Builder for [`HTTPHandler`](crate::http_handler::HTTPHandler).
//!
//! Exposes endpoint and request target configuration, method and payload
//! format selection, TLS strictness and timeouts.

use std::sync::Arc;
use std::time::Duration;

use native_tls::Certificate;

use crate::encoder::PayloadFormat;
use crate::endpoint::{DEFAULT_HTTP_PORT, DEFAULT_HTTPS_PORT, Endpoint};
use crate::http_handler::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, HTTPHandler, HTTPHandlerConfig, HTTPMethod,
    HTTPTransport,
};
use crate::reporter::LogReporter;
use crate::tls::TlsOptions;

use super::builder_macros::{ensure_positive, option_setter, timeout_from_ms};
use super::{HandlerBuildError, HandlerBuilderTrait};

/// Builder for constructing [`HTTPHandler`] instances.
///
/// Defaults to HTTPS with strict verification and JSON payloads.
#[derive(Clone, Debug)]
pub struct HTTPHandlerBuilder {
    endpoint: Option<String>,
    url: Option<String>,
    method: HTTPMethod,
    json: bool,
    secure: bool,
    strict: bool,
    root_certificates_pem: Vec<Vec<u8>>,
    connect_timeout_ms: Option<u64>,
    io_timeout_ms: Option<u64>,
    blocking: bool,
    warn_interval_ms: Option<u64>,
}

impl Default for HTTPHandlerBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            url: None,
            method: HTTPMethod::default(),
            json: true,
            secure: true,
            strict: true,
            root_certificates_pem: Vec::new(),
            connect_timeout_ms: None,
            io_timeout_ms: None,
            blocking: false,
            warn_interval_ms: None,
        }
    }
}

impl HTTPHandlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target as `host` or `host:port`; the port defaults to 443 or 80.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Request target such as `/log` or `/ingest?source=app`.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: HTTPMethod) -> Self {
        self.method = method;
        self
    }

    /// Send JSON (`true`, always POSTed) or a form-encoded payload.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_root_certificate_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.root_certificates_pem.push(pem.into());
        self
    }

    /// Disable the connect and I/O timeouts entirely.
    pub fn without_timeouts(mut self) -> Self {
        self.blocking = true;
        self
    }

    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the request write and reply read timeout in milliseconds."]
        with_io_timeout_ms,
        io_timeout_ms,
        u64
    );
    option_setter!(with_warn_interval_ms, warn_interval_ms, u64);

    fn validate(&self) -> Result<(), HandlerBuildError> {
        self.validate_url()?;
        if self.blocking && (self.connect_timeout_ms.is_some() || self.io_timeout_ms.is_some()) {
            return Err(HandlerBuildError::InvalidConfig(
                "timeouts cannot be set when timeouts are disabled".into(),
            ));
        }
        if !self.secure && !self.root_certificates_pem.is_empty() {
            return Err(HandlerBuildError::InvalidConfig(
                "root certificates require a secure transport".into(),
            ));
        }
        if let Some(interval) = self.warn_interval_ms {
            ensure_positive!(interval, "warn_interval_ms")?;
        }
        Ok(())
    }

    fn validate_url(&self) -> Result<(), HandlerBuildError> {
        match &self.url {
            Some(url) if url.contains("://") => Err(HandlerBuildError::InvalidConfig(
                "url must be a request target; set the host with with_endpoint".into(),
            )),
            Some(url) if url.chars().any(char::is_whitespace) => Err(
                HandlerBuildError::InvalidConfig("url must not contain whitespace".into()),
            ),
            _ => Ok(()),
        }
    }

    fn default_port(&self) -> u16 {
        if self.secure {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        }
    }

    fn build_endpoint(&self) -> Result<Endpoint, HandlerBuildError> {
        match &self.endpoint {
            Some(raw) => Endpoint::parse(raw, self.default_port())
                .map_err(|err| HandlerBuildError::InvalidConfig(err.to_string())),
            None => Ok(Endpoint::new("localhost", self.default_port())),
        }
    }

    fn build_tls(&self) -> Result<Option<TlsOptions>, HandlerBuildError> {
        if !self.secure {
            return Ok(None);
        }
        let roots = self
            .root_certificates_pem
            .iter()
            .map(|pem| Certificate::from_pem(pem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(
            TlsOptions::strict(self.strict).with_root_certificates(roots),
        ))
    }

    /// Validate the settings and produce the transport configuration.
    pub fn build_config(&self) -> Result<HTTPHandlerConfig, HandlerBuildError> {
        self.validate()?;
        let (connect_timeout, io_timeout) = if self.blocking {
            (None, None)
        } else {
            (
                timeout_from_ms(
                    self.connect_timeout_ms,
                    "connect_timeout_ms",
                    Some(DEFAULT_CONNECT_TIMEOUT),
                )?,
                timeout_from_ms(self.io_timeout_ms, "io_timeout_ms", Some(DEFAULT_IO_TIMEOUT))?,
            )
        };
        Ok(HTTPHandlerConfig {
            endpoint: self.build_endpoint()?,
            url: self.url.clone().unwrap_or_else(|| "/".into()),
            method: self.method,
            format: if self.json {
                PayloadFormat::Json
            } else {
                PayloadFormat::UrlEncoded
            },
            tls: self.build_tls()?,
            connect_timeout,
            io_timeout,
        })
    }
}

impl HandlerBuilderTrait for HTTPHandlerBuilder {
    type Handler = HTTPHandler;

    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError> {
        let transport = HTTPTransport::new(self.build_config()?)?;
        let reporter = match self.warn_interval_ms {
            Some(ms) => LogReporter::new(Duration::from_millis(ms)),
            None => LogReporter::default(),
        };
        Ok(HTTPHandler::with_reporter(transport, Arc::new(reporter)))
    }
}
