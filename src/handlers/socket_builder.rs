//! Builder for [`SocketHandler`](crate::socket_handler::SocketHandler).
//!
//! Exposes endpoint selection, TLS strictness, extra trust anchors, timeout
//! tuning and the line options of the socket protocol.

use std::sync::Arc;
use std::time::Duration;

use native_tls::Certificate;

use crate::encoder::PipeEscaping;
use crate::endpoint::{DEFAULT_SOCKET_PORT, Endpoint};
use crate::reporter::LogReporter;
use crate::socket_handler::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, SocketHandler, SocketHandlerConfig,
    SocketTransport,
};
use crate::tls::TlsOptions;

use super::builder_macros::{ensure_positive, option_setter, timeout_from_ms};
use super::{HandlerBuildError, HandlerBuilderTrait};

/// Builder for constructing [`SocketHandler`] instances.
///
/// Secure and strict by default, matching the protocol defaults.
#[derive(Clone, Debug)]
pub struct SocketHandlerBuilder {
    endpoint: Option<String>,
    secure: bool,
    strict: bool,
    root_certificates_pem: Vec<Vec<u8>>,
    path: Option<String>,
    escaping: PipeEscaping,
    line_terminator: bool,
    hostname: Option<String>,
    connect_timeout_ms: Option<u64>,
    io_timeout_ms: Option<u64>,
    blocking: bool,
    warn_interval_ms: Option<u64>,
}

impl Default for SocketHandlerBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            secure: true,
            strict: true,
            root_certificates_pem: Vec::new(),
            path: None,
            escaping: PipeEscaping::default(),
            line_terminator: false,
            hostname: None,
            connect_timeout_ms: None,
            io_timeout_ms: None,
            blocking: false,
            warn_interval_ms: None,
        }
    }
}

impl SocketHandlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target as `host` or `host:port`; the port defaults to 10800.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Use TLS 1.2 (`true`, the default) or plain TCP.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Verify the peer certificate chain and hostname.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Trust an extra PEM-encoded root certificate.
    pub fn with_root_certificate_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.root_certificates_pem.push(pem.into());
        self
    }

    pub fn with_escaping(mut self, escaping: PipeEscaping) -> Self {
        self.escaping = escaping;
        self
    }

    pub fn with_line_terminator(mut self, enabled: bool) -> Self {
        self.line_terminator = enabled;
        self
    }

    /// Disable the connect and I/O timeouts entirely.
    pub fn without_timeouts(mut self) -> Self {
        self.blocking = true;
        self
    }

    option_setter!(
        #[doc = "Set the path tag sent as the third field."]
        with_path,
        path,
        String
    );
    option_setter!(with_hostname, hostname, String);
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_io_timeout_ms, io_timeout_ms, u64);
    option_setter!(with_warn_interval_ms, warn_interval_ms, u64);

    fn validate(&self) -> Result<(), HandlerBuildError> {
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

    fn build_endpoint(&self) -> Result<Endpoint, HandlerBuildError> {
        match &self.endpoint {
            Some(raw) => Endpoint::parse(raw, DEFAULT_SOCKET_PORT)
                .map_err(|err| HandlerBuildError::InvalidConfig(err.to_string())),
            None => Ok(Endpoint::new("localhost", DEFAULT_SOCKET_PORT)),
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
    pub fn build_config(&self) -> Result<SocketHandlerConfig, HandlerBuildError> {
        self.validate()?;
        let (connect, io) = if self.blocking {
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
        let mut config = SocketHandlerConfig::default()
            .with_endpoint(self.build_endpoint()?)
            .with_timeouts(connect, io);
        config = match self.build_tls()? {
            Some(tls) => config.with_tls(tls),
            None => config.plain(),
        };
        if let Some(path) = &self.path {
            config = config.with_path(path.clone());
        }
        if let Some(hostname) = &self.hostname {
            config = config.with_hostname(hostname.clone());
        }
        config.escaping = self.escaping;
        config.line_terminator = self.line_terminator;
        Ok(config)
    }
}

impl HandlerBuilderTrait for SocketHandlerBuilder {
    type Handler = SocketHandler;

    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError> {
        let transport = SocketTransport::new(self.build_config()?)?;
        let reporter = match self.warn_interval_ms {
            Some(ms) => LogReporter::new(Duration::from_millis(ms)),
            None => LogReporter::default(),
        };
        Ok(SocketHandler::with_reporter(transport, Arc::new(reporter)))
    }
}
