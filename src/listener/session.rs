//! Per-connection lifecycle.
//!
//! Each accepted connection carries exactly one record:
//!
//! ```text
//! Accepted -> Handshaking -> Established -> Closed
//! ```
//!
//! Plain TCP connections skip `Handshaking`. The line is read up to `\n` or
//! EOF, the connection is closed, and only then is the line handed to the
//! consumer.

use std::{
    io::{self, BufRead, BufReader, Read},
    net::{SocketAddr, TcpStream},
    sync::Arc,
    time::Duration,
};

use log::{debug, trace, warn};
use native_tls::HandshakeError;
use thiserror::Error;

use super::{RecordConsumer, acceptor::ServerTls};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Handshaking,
    Established,
    Closed,
}

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("TLS handshake timed out")]
    HandshakeTimedOut,
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Everything a worker needs to serve a connection.
pub(crate) struct SessionContext {
    pub(crate) tls: Option<ServerTls>,
    pub(crate) consumer: Arc<dyn RecordConsumer>,
    pub(crate) handshake_timeout: Option<Duration>,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) max_line_length: usize,
}

pub(crate) struct Session {
    peer: SocketAddr,
    state: ConnectionState,
}

/// Read one line, bounded by `max` bytes, tolerating an abrupt EOF once data
/// has arrived.
fn read_one_line<R: Read>(reader: R, max: usize) -> Result<String, SessionError> {
    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    let mut reader = BufReader::new(reader.take(limit));
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf) {
        Ok(_) => {}
        Err(err)
            if !buf.is_empty()
                && !matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
        {
            debug!("logship listener: connection ended uncleanly after data: {err}");
        }
        Err(err) => return Err(err.into()),
    }
    let content_len = buf.strip_suffix(b"\n").map_or(buf.len(), <[u8]>::len);
    if content_len > max {
        return Err(SessionError::LineTooLong(max));
    }
    Ok(String::from_utf8_lossy(&buf).trim().to_owned())
}

impl Session {
    pub(crate) fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            state: ConnectionState::Accepted,
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        trace!(
            "logship listener: {} {:?} -> {:?}",
            self.peer, self.state, next
        );
        self.state = next;
    }

    /// Serve the connection and hand a non-empty line to the consumer.
    pub(crate) fn serve(mut self, ctx: &SessionContext, stream: TcpStream) {
        let result = self.read_record(ctx, stream);
        self.transition(ConnectionState::Closed);
        match result {
            Ok(line) if line.is_empty() => {
                debug!("logship listener: {} closed without a record", self.peer);
            }
            Ok(line) => ctx.consumer.consume(line, self.peer),
            Err(err) => warn!("logship listener: {}: {err}", self.peer),
        }
    }

    fn read_record(
        &mut self,
        ctx: &SessionContext,
        stream: TcpStream,
    ) -> Result<String, SessionError> {
        let Some(tls) = &ctx.tls else {
            self.transition(ConnectionState::Established);
            stream.set_read_timeout(ctx.read_timeout)?;
            return read_one_line(&stream, ctx.max_line_length);
        };

        self.transition(ConnectionState::Handshaking);
        stream.set_read_timeout(ctx.handshake_timeout)?;
        stream.set_write_timeout(ctx.handshake_timeout)?;
        let mut tls_stream = tls.acceptor().accept(stream).map_err(|err| match err {
            HandshakeError::WouldBlock(_) => SessionError::HandshakeTimedOut,
            HandshakeError::Failure(err) => SessionError::Handshake(err.to_string()),
        })?;
        self.transition(ConnectionState::Established);
        tls_stream.get_ref().set_read_timeout(ctx.read_timeout)?;
        let line = read_one_line(&mut tls_stream, ctx.max_line_length)?;
        if let Err(err) = tls_stream.shutdown() {
            debug!("logship listener: {} TLS shutdown failed: {err}", self.peer);
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"a|b|c\n".as_slice(), "a|b|c")]
    #[case(b"no terminator".as_slice(), "no terminator")]
    #[case(b"  padded \r\n".as_slice(), "padded")]
    #[case(b"first\nsecond\n".as_slice(), "first")]
    #[case(b"".as_slice(), "")]
    fn reads_exactly_one_line(#[case] input: &[u8], #[case] expected: &str) {
        assert_eq!(read_one_line(input, 64).expect("line"), expected);
    }

    #[rstest]
    fn rejects_lines_over_limit() {
        let err = read_one_line(b"0123456789".as_slice(), 4).expect_err("too long");
        assert!(matches!(err, SessionError::LineTooLong(4)));
    }

    #[rstest]
    fn line_at_limit_is_accepted() {
        assert_eq!(read_one_line(b"0123\n".as_slice(), 4).expect("line"), "0123");
    }

    #[rstest]
    fn invalid_utf8_is_replaced() {
        let line = read_one_line(b"ok \xff\n".as_slice(), 64).expect("line");
        assert_eq!(line, "ok \u{fffd}");
    }
}
