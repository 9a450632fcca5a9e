//! Reference accepting listener.
//!
//! Binds a TCP socket, optionally wraps each connection in TLS 1.2, reads one
//! line per connection and hands it to a [`RecordConsumer`].
//!
//! Accepting and serving are decoupled: the accept loop only queues
//! connections, while a fixed pool of workers performs the TLS handshake and
//! the read. A slow or silent peer therefore occupies one worker, bounded by
//! the handshake and read timeouts, and never stalls the accept loop. When the
//! workers and the queue are all busy the [`SaturationPolicy`] decides whether
//! new connections are closed or the accept loop waits.

mod acceptor;
mod config;
mod pool;
mod session;


use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::rate_limited_warner::RateLimitedWarner;

pub use acceptor::ServerTls;
pub use config::{
    DEFAULT_BACKLOG, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_LINE_LENGTH, DEFAULT_READ_TIMEOUT,
    DEFAULT_WORKERS, ListenerConfig, SaturationPolicy,
};
pub use session::ConnectionState;

use pool::{Job, Submit, WorkerPool};
use session::SessionContext;

/// Receives each non-empty line with the address it came from.
///
/// Called from worker threads after the connection has been closed. Panics
/// are not caught.
pub trait RecordConsumer: Send + Sync {
    fn consume(&self, line: String, peer: SocketAddr);
}

impl<F> RecordConsumer for F
where
    F: Fn(String, SocketAddr) + Send + Sync,
{
    fn consume(&self, line: String, peer: SocketAddr) {
        self(line, peer);
    }
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("listener TLS error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("invalid listener configuration: {0}")]
    InvalidConfig(String),
    #[error("listener thread panicked")]
    ThreadPanicked,
}

/// A bound listener that has not started accepting yet.
pub struct AcceptingListener {
    listener: TcpListener,
    config: ListenerConfig,
    ctx: Arc<SessionContext>,
    stop: Arc<AtomicBool>,
}

impl AcceptingListener {
    /// Bind `config.bind`. Plain TCP when `tls` is `None`.
    pub fn bind(
        config: ListenerConfig,
        tls: Option<ServerTls>,
        consumer: impl RecordConsumer + 'static,
    ) -> Result<Self, ListenerError> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind)?;
        let ctx = Arc::new(SessionContext {
            tls,
            consumer: Arc::new(consumer),
            handshake_timeout: config.handshake_timeout,
            read_timeout: config.read_timeout,
            max_line_length: config.max_line_length,
        });
        Ok(Self {
            listener,
            config,
            ctx,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Accept connections on the current thread until the process ends.
    pub fn serve(self) -> Result<(), ListenerError> {
        let mut pool = WorkerPool::new(
            self.config.workers,
            self.config.backlog,
            Arc::clone(&self.ctx),
        )?;
        let result = self.accept_loop(&pool);
        pool.shutdown();
        result
    }

    /// Accept connections on a background thread.
    pub fn spawn(self) -> Result<ListenerHandle, ListenerError> {
        let local_addr = self.local_addr()?;
        let stop = Arc::clone(&self.stop);
        let thread = thread::Builder::new()
            .name("logship-accept".into())
            .spawn(move || self.serve())?;
        Ok(ListenerHandle {
            local_addr,
            stop,
            thread: Some(thread),
        })
    }

    fn accept_loop(&self, pool: &WorkerPool) -> Result<(), ListenerError> {
        let rejected = RateLimitedWarner::new(self.config.warn_interval);
        let failed = RateLimitedWarner::new(self.config.warn_interval);
        info!(
            "logship listener: accepting on {} ({})",
            self.local_addr()?,
            if self.ctx.tls.is_some() { "TLS" } else { "plain" }
        );
        loop {
            let accepted = self.listener.accept();
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(err) => match classify_accept_error(&err) {
                    AcceptFailure::Transient => {
                        debug!("logship listener: accept failed: {err}");
                        continue;
                    }
                    AcceptFailure::Exhausted => {
                        failed.record_drop();
                        failed.warn_if_due(|count| {
                            warn!("logship listener: accept failed {count} times: {err}");
                        });
                        thread::sleep(ACCEPT_BACKOFF);
                        continue;
                    }
                    AcceptFailure::Fatal => return Err(err.into()),
                },
            };
            match pool.submit(Job { stream, peer }, self.config.saturation) {
                Submit::Queued => {}
                Submit::Rejected(job) => {
                    drop(job);
                    rejected.record_drop();
                    rejected.warn_if_due(|count| {
                        warn!("logship listener: pool saturated, rejected {count} connections");
                    });
                }
                Submit::Closed => break,
            }
        }
        rejected.flush(|count| {
            warn!("logship listener: pool saturated, rejected {count} connections");
        });
        failed.flush(|count| {
            warn!("logship listener: accept failed {count} times");
        });
        Ok(())
    }
}

impl std::fmt::Debug for AcceptingListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptingListener")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("config", &self.config)
            .field("tls", &self.ctx.tls.is_some())
            .finish()
    }
}

/// Pause after an accept failure that will not clear immediately, such as
/// running out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[cfg(unix)]
const EBADF: i32 = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AcceptFailure {
    /// The peer went away before the connection was taken; retry at once.
    Transient,
    /// Descriptor or memory exhaustion; back off and keep serving.
    Exhausted,
    /// The listening socket itself is unusable.
    Fatal,
}

fn classify_accept_error(err: &io::Error) -> AcceptFailure {
    #[cfg(unix)]
    if err.raw_os_error() == Some(EBADF) {
        return AcceptFailure::Fatal;
    }
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => AcceptFailure::Transient,
        io::ErrorKind::InvalidInput | io::ErrorKind::Unsupported => AcceptFailure::Fatal,
        _ => AcceptFailure::Exhausted,
    }
}

/// Handle to a listener running on a background thread.
///
/// Dropping the handle stops the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), ListenerError>>>,
}

/// Address the accept loop can be woken through.
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::from((Ipv6Addr::LOCALHOST, addr.port()))
        }
        _ => addr,
    }
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let queued connections finish and join every thread.
    pub fn shutdown(mut self) -> Result<(), ListenerError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), ListenerError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.stop.store(true, Ordering::Release);
        if let Err(err) =
            TcpStream::connect_timeout(&wake_addr(self.local_addr), Duration::from_secs(1))
        {
            debug!("logship listener: wake-up connection failed: {err}");
        }
        thread.join().map_err(|_| ListenerError::ThreadPanicked)?
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.stop_and_join() {
            warn!("logship listener: shutdown failed: {err}");
        }
    }
}
