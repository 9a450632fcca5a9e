//! Fixed-size worker pool fed by a bounded queue.

use std::{
    io,
    net::{SocketAddr, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::warn;

use super::{
    config::SaturationPolicy,
    session::{Session, SessionContext},
};

/// An accepted connection waiting for a worker.
pub(crate) struct Job {
    pub(crate) stream: TcpStream,
    pub(crate) peer: SocketAddr,
}

/// Result of handing a connection to the pool.
pub(crate) enum Submit {
    Queued,
    /// Pool saturated; the connection was handed back to be closed.
    Rejected(Job),
    /// Workers are gone.
    Closed,
}

pub(crate) struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

fn worker_loop(rx: Receiver<Job>, ctx: Arc<SessionContext>) {
    while let Ok(Job { stream, peer }) = rx.recv() {
        Session::new(peer).serve(&ctx, stream);
    }
}

impl WorkerPool {
    pub(crate) fn new(workers: usize, backlog: usize, ctx: Arc<SessionContext>) -> io::Result<Self> {
        let (tx, rx) = bounded(backlog);
        let mut pool = Self {
            tx: Some(tx),
            workers: Vec::with_capacity(workers),
        };
        for index in 0..workers {
            let rx = rx.clone();
            let ctx = Arc::clone(&ctx);
            let handle = thread::Builder::new()
                .name(format!("logship-listener-{index}"))
                .spawn(move || worker_loop(rx, ctx));
            match handle {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    pool.shutdown();
                    return Err(err);
                }
            }
        }
        Ok(pool)
    }

    pub(crate) fn submit(&self, job: Job, policy: SaturationPolicy) -> Submit {
        let Some(tx) = &self.tx else {
            return Submit::Closed;
        };
        match policy {
            SaturationPolicy::Reject => match tx.try_send(job) {
                Ok(()) => Submit::Queued,
                Err(TrySendError::Full(job)) => Submit::Rejected(job),
                Err(TrySendError::Disconnected(_)) => Submit::Closed,
            },
            SaturationPolicy::Block => match tx.send(job) {
                Ok(()) => Submit::Queued,
                Err(_) => Submit::Closed,
            },
        }
    }

    /// Let workers finish queued connections, then join them.
    pub(crate) fn shutdown(&mut self) {
        self.tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("logship listener: worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
