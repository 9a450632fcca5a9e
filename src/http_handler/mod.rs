//! HTTP-based transport.
//!
//! [`HTTPTransport`] sends every [`LogRecord`](crate::log_record::LogRecord)
//! as its own HTTP(S) request.
//!
//! # Payload formats
//!
//! - **URL-encoded**: `application/x-www-form-urlencoded`, appended to the
//!   query string for `GET` or sent as the body for `POST`.
//! - **JSON**: `application/json`, always sent with `POST` whatever method is
//!   configured.
//!
//! # Reply handling
//!
//! The reply is read to the end and discarded. Any HTTP status counts as a
//! completed delivery; only transport failures (refused, timed out, TLS,
//! protocol errors) are returned as [`DeliveryError`](crate::error::DeliveryError)s.
//! The `Host` header carries the configured host without its port.

mod config;
mod handler;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, HTTPHandlerConfig, HTTPMethod, append_query,
};
pub use handler::{HTTPHandler, HTTPTransport};
