//! Remote endpoint parsing.
//!
//! Transports are configured with a combined `host[:port]` string. When the
//! port is missing a protocol default is used: [`DEFAULT_SOCKET_PORT`] for the
//! line protocol and 80/443 for HTTP depending on whether TLS is enabled.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use thiserror::Error;

pub const DEFAULT_SOCKET_PORT: u16 = 10800;
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("invalid port in {0:?}")]
    InvalidPort(String),
    #[error("unterminated IPv6 literal in {0:?}")]
    UnterminatedBracket(String),
}

/// Host and port of a collector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP literal, without brackets or port suffix.
    pub host: String,
    pub port: u16,
}

fn parse_port(raw: &str, input: &str) -> Result<u16, EndpointError> {
    raw.parse()
        .map_err(|_| EndpointError::InvalidPort(input.to_owned()))
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
    ///
    /// An unbracketed string containing several colons is taken to be a bare
    /// IPv6 address and receives `default_port`.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, EndpointError> {
        let trimmed = input.trim();
        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| EndpointError::UnterminatedBracket(input.to_owned()))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, input)?,
                None if tail.is_empty() => default_port,
                None => return Err(EndpointError::InvalidPort(input.to_owned())),
            };
            (host, port)
        } else {
            match trimmed.split_once(':') {
                Some((host, port)) if !port.contains(':') => (host, parse_port(port, input)?),
                _ => (trimmed, default_port),
            }
        };
        if host.is_empty() {
            return Err(EndpointError::EmptyHost);
        }
        Ok(Self::new(host, port))
    }

    pub(crate) fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(Iterator::collect)
    }

    /// Host formatted for use in a URL authority.
    pub(crate) fn url_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.url_host(), self.port)
    }
}
