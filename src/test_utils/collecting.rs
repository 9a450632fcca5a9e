//! In-memory sinks for test assertions.
//!
//! [`CollectingConsumer`] stands in for the application behind a listener and
//! [`CollectingReporter`] for the diagnostic channel behind a handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::DeliveryError;
use crate::listener::RecordConsumer;
use crate::log_record::LogRecord;
use crate::reporter::ErrorReporter;

/// Consumer that stores every line it receives.
#[derive(Clone, Default)]
pub struct CollectingConsumer {
    inner: Arc<(Mutex<Vec<(String, SocketAddr)>>, Condvar)>,
}

impl CollectingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines received so far.
    pub fn lines(&self) -> Vec<String> {
        self.inner.0.lock().iter().map(|(line, _)| line.clone()).collect()
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.inner.0.lock().iter().map(|(_, peer)| *peer).collect()
    }

    /// Block until at least `count` lines arrived or `timeout` elapsed.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let (lines, ready) = &*self.inner;
        let mut guard = lines.lock();
        while guard.len() < count {
            if ready.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        guard.iter().map(|(line, _)| line.clone()).collect()
    }
}

impl RecordConsumer for CollectingConsumer {
    fn consume(&self, line: String, peer: SocketAddr) {
        let (lines, ready) = &*self.inner;
        lines.lock().push((line, peer));
        ready.notify_all();
    }
}

/// Reporter recording every failure it is handed.
#[derive(Default)]
pub struct CollectingReporter {
    pub refused: Mutex<Vec<String>>,
    pub failed: Mutex<Vec<String>>,
}

impl ErrorReporter for CollectingReporter {
    fn connection_refused(&self, _record: &LogRecord, err: &DeliveryError) {
        self.refused.lock().push(err.to_string());
    }

    fn delivery_failed(&self, _record: &LogRecord, err: &DeliveryError) {
        self.failed.lock().push(err.to_string());
    }
}
