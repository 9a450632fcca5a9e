//! Configuration consumed by [`SocketTransport`](super::SocketTransport).
//!
//! `SocketHandlerBuilder` validates and constructs these values; tests and
//! embedders may also build them directly.

use std::time::Duration;

use crate::encoder::PipeEscaping;
use crate::endpoint::{DEFAULT_SOCKET_PORT, Endpoint};
use crate::tls::TlsOptions;

/// Default timeout for establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for each read or write, including the TLS handshake.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct SocketHandlerConfig {
    pub endpoint: Endpoint,
    /// TLS settings; `None` sends the line over plain TCP.
    pub tls: Option<TlsOptions>,
    /// Free-form path tag sent as the third field.
    pub path: String,
    pub escaping: PipeEscaping,
    /// Append `\n` after the line. Off by default: the collector reads to EOF.
    pub line_terminator: bool,
    /// `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// `None` lets a stalled peer block the caller indefinitely.
    pub io_timeout: Option<Duration>,
    /// Overrides the local hostname sent as the second field.
    pub hostname: Option<String>,
}

/// Strict TLS 1.2 to `localhost:10800`, matching the wire defaults.
impl Default for SocketHandlerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("localhost", DEFAULT_SOCKET_PORT),
            tls: Some(TlsOptions::strict(true).pinned_to_tls12()),
            path: String::new(),
            escaping: PipeEscaping::default(),
            line_terminator: false,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
            hostname: None,
        }
    }
}

impl SocketHandlerConfig {
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Send over plain TCP.
    pub fn plain(mut self) -> Self {
        self.tls = None;
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls.pinned_to_tls12());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Option<Duration>, io: Option<Duration>) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}
