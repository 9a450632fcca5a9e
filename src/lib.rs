//! Log record shipping over a pipe-delimited socket line protocol or HTTP(S).
//!
//! Each record is delivered synchronously over its own connection:
//!
//! - [`SocketTransport`] writes one six-field line over plain TCP or TLS 1.2;
//! - [`HTTPTransport`] sends one GET or POST request carrying a form or JSON
//!   payload;
//! - [`AcceptingListener`] is the reference collector for the line protocol.
//!
//! Delivery failures never surface to the emitting code. [`ShippingHandler`]
//! routes them to an [`ErrorReporter`] and returns a [`DeliveryOutcome`].

pub mod encoder;
pub mod endpoint;
pub mod error;
pub mod file_config;
pub mod handler;
pub mod handlers;
pub mod http_handler;
pub mod level;
pub mod listener;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod log_record;
pub mod rate_limited_warner;
pub mod reporter;
pub mod socket_handler;
pub mod tls;

#[cfg(test)]
mod test_utils;

pub use encoder::{
    PipeEscaping, SocketLine, encode_http_payload, encode_socket_line, parse_socket_line,
    parse_socket_line_with,
};
pub use endpoint::Endpoint;
pub use error::{DeliveryError, FailureKind};
pub use file_config::{ConfigError, FileConfig, HandlerConfig};
pub use handler::{DeliveryOutcome, RecordHandler, ShippingHandler, Transport};
pub use handlers::{HTTPHandlerBuilder, HandlerBuildError, HandlerBuilderTrait, SocketHandlerBuilder};
pub use http_handler::{HTTPHandler, HTTPHandlerConfig, HTTPMethod, HTTPTransport};
pub use level::LogLevel;
pub use listener::{
    AcceptingListener, ListenerConfig, ListenerError, ListenerHandle, RecordConsumer,
    SaturationPolicy, ServerTls,
};
#[cfg(feature = "log-compat")]
pub use log_compat::LogShipAdapter;
pub use log_record::{LogRecord, RecordMessage, RecordMetadata};
pub use reporter::{ErrorReporter, LogReporter, SilentReporter};
pub use socket_handler::{SocketHandler, SocketHandlerConfig, SocketTransport};
pub use tls::TlsOptions;
