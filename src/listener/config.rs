//! Listener configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::endpoint::DEFAULT_SOCKET_PORT;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

use super::ListenerError;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_BACKLOG: usize = 64;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// What the accept loop does when every worker is busy and the queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaturationPolicy {
    /// Close the new connection immediately.
    #[default]
    Reject,
    /// Stop accepting until a queue slot frees up.
    Block,
}

#[derive(Clone, Debug)]
pub struct ListenerConfig {
    pub bind: SocketAddr,
    /// Threads handshaking and reading connections.
    pub workers: usize,
    /// Accepted connections allowed to wait for a worker.
    pub backlog: usize,
    pub handshake_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// Longest line accepted, excluding the terminator.
    pub max_line_length: usize,
    pub saturation: SaturationPolicy,
    /// Interval between rejected-connection warnings.
    pub warn_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_SOCKET_PORT)),
            workers: DEFAULT_WORKERS,
            backlog: DEFAULT_BACKLOG,
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            saturation: SaturationPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

fn ensure_non_zero_timeout(field: &str, value: Option<Duration>) -> Result<(), ListenerError> {
    match value {
        Some(timeout) if timeout.is_zero() => Err(ListenerError::InvalidConfig(format!(
            "{field} must be greater than zero"
        ))),
        _ => Ok(()),
    }
}

impl ListenerConfig {
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_saturation(mut self, saturation: SaturationPolicy) -> Self {
        self.saturation = saturation;
        self
    }

    pub fn with_timeouts(mut self, handshake: Option<Duration>, read: Option<Duration>) -> Self {
        self.handshake_timeout = handshake;
        self.read_timeout = read;
        self
    }

    /// Upper bound on connections held at once (busy workers plus queue).
    pub fn max_connections(&self) -> usize {
        self.workers.saturating_add(self.backlog)
    }

    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.workers == 0 {
            return Err(ListenerError::InvalidConfig(
                "workers must be greater than zero".into(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(ListenerError::InvalidConfig(
                "max_line_length must be greater than zero".into(),
            ));
        }
        ensure_non_zero_timeout("handshake_timeout", self.handshake_timeout)?;
        ensure_non_zero_timeout("read_timeout", self.read_timeout)
    }
}
