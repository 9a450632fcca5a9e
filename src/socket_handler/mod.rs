//! Socket line protocol transport.
//!
//! [`SocketTransport`] encodes each [`LogRecord`](crate::log_record::LogRecord)
//! as a six-field pipe-delimited line, opens a fresh TCP connection
//! (optionally TLS 1.2), writes the line and closes. There is no queue, no
//! retry and no connection reuse: a refused or failed delivery drops the
//! record after the failure is returned to the caller.

mod config;
mod handler;
mod transport;


use once_cell::sync::Lazy;
use sysinfo::System;

pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, SocketHandlerConfig};
pub use handler::{SocketHandler, SocketTransport};

static LOCAL_HOSTNAME: Lazy<String> =
    Lazy::new(|| System::host_name().unwrap_or_else(|| "localhost".to_owned()));

/// Hostname sent in the second field of every line, resolved once.
pub fn local_hostname() -> &'static str {
    &LOCAL_HOSTNAME
}
