//! Delivery error taxonomy.
//!
//! Every failure a transport can hit maps to one [`DeliveryError`]. Callers
//! that only need the coarse policy split (drop quietly vs. report) use
//! [`DeliveryError::kind`].

use std::io;

use thiserror::Error;

/// Stage of a delivery at which a timeout fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Handshake,
    Write,
    Response,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Connect => "connecting to",
            Stage::Handshake => "negotiating TLS with",
            Stage::Write => "writing to",
            Stage::Response => "awaiting response from",
        })
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The collector actively refused the connection.
    #[error("connection to {endpoint} refused")]
    ConnectionRefused { endpoint: String },
    #[error("timed out {stage} {endpoint}")]
    TimedOut { endpoint: String, stage: Stage },
    #[error("TLS negotiation with {endpoint} failed: {message}")]
    Tls { endpoint: String, message: String },
    #[error("I/O error {stage} {endpoint}: {source}")]
    Io {
        endpoint: String,
        stage: Stage,
        #[source]
        source: io::Error,
    },
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("could not encode record: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Coarse classification driving how a failure is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Dropped after a diagnostic.
    ConnectionRefused,
    /// Routed to the failure reporter.
    Transport,
}

impl DeliveryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DeliveryError::ConnectionRefused { .. } => FailureKind::ConnectionRefused,
            _ => FailureKind::Transport,
        }
    }

    /// Classify an I/O error raised while talking to `endpoint`.
    pub(crate) fn from_io(endpoint: impl Into<String>, stage: Stage, err: io::Error) -> Self {
        let endpoint = endpoint.into();
        match err.kind() {
            io::ErrorKind::ConnectionRefused => DeliveryError::ConnectionRefused { endpoint },
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                DeliveryError::TimedOut { endpoint, stage }
            }
            _ => DeliveryError::Io {
                endpoint,
                stage,
                source: err,
            },
        }
    }
}
