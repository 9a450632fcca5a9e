//! Connection primitives for the socket transport.
//!
//! A [`Connection`] lives for exactly one record. Dropping it closes the
//! socket, so every early return in the delivery path releases the
//! connection; [`Connection::close`] additionally sends the TLS
//! `close_notify` and a TCP shutdown on the success path.

use std::{
    io::{self, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

use log::debug;
use native_tls::{HandshakeError, TlsConnector, TlsStream};

use crate::endpoint::Endpoint;
use crate::error::{DeliveryError, Stage};

/// Active per-record connection.
pub(crate) enum Connection {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Connection {
    pub(crate) fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Connection::Plain(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
            Connection::Tls(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
        }
    }

    /// Close gracefully. Errors are irrelevant once the line is written.
    pub(crate) fn close(self) {
        let result = match self {
            Connection::Plain(stream) => stream.shutdown(Shutdown::Both),
            Connection::Tls(mut stream) => stream
                .shutdown()
                .and_then(|()| stream.get_ref().shutdown(Shutdown::Both)),
        };
        if let Err(err) = result {
            debug!("logship: error while closing connection: {err}");
        }
    }
}

/// Connect to the first reachable address of `endpoint`.
pub(crate) fn connect_tcp(
    endpoint: &Endpoint,
    timeout: Option<Duration>,
) -> Result<TcpStream, DeliveryError> {
    let target = endpoint.to_string();
    let addrs = endpoint
        .socket_addrs()
        .map_err(|err| DeliveryError::from_io(target.as_str(), Stage::Connect, err))?;
    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    let err = last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{target} did not resolve to any address"),
        )
    });
    Err(DeliveryError::from_io(target, Stage::Connect, err))
}

fn map_handshake_error(target: String, err: HandshakeError<TcpStream>) -> DeliveryError {
    match err {
        // A blocking socket only reports WouldBlock when its timeout expired.
        HandshakeError::WouldBlock(_) => DeliveryError::TimedOut {
            endpoint: target,
            stage: Stage::Handshake,
        },
        HandshakeError::Failure(err) => DeliveryError::Tls {
            endpoint: target,
            message: err.to_string(),
        },
    }
}

/// Open a connection for one record, negotiating TLS when `connector` is set.
pub(crate) fn open_connection(
    endpoint: &Endpoint,
    connector: Option<&TlsConnector>,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
) -> Result<Connection, DeliveryError> {
    let stream = connect_tcp(endpoint, connect_timeout)?;
    let configure = |stream: &TcpStream| -> io::Result<()> {
        stream.set_read_timeout(io_timeout)?;
        stream.set_write_timeout(io_timeout)?;
        stream.set_nodelay(true)
    };
    configure(&stream)
        .map_err(|err| DeliveryError::from_io(endpoint.to_string(), Stage::Connect, err))?;

    let Some(connector) = connector else {
        return Ok(Connection::Plain(stream));
    };
    connector
        .connect(&endpoint.host, stream)
        .map(|tls| Connection::Tls(Box::new(tls)))
        .map_err(|err| map_handshake_error(endpoint.to_string(), err))
}
