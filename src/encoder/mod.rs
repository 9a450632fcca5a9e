//! Record encoders for both wire protocols.
//!
//! - [`encode_socket_line`] renders the six-field pipe-delimited line sent by
//!   the socket transport; [`parse_socket_line`] and [`parse_socket_line_with`]
//!   are its collector-side inverse.
//! - [`encode_http_payload`] renders the full attribute mapping as either
//!   `application/x-www-form-urlencoded` or `application/json`.
//!
//! Encoding the message never fails; see
//! [`RecordMessage::render`](crate::log_record::RecordMessage::render).

mod line;
mod payload;
mod record;
mod url_encoding;

pub use line::{
    LineParseError, PipeEscaping, SOCKET_LINE_FIELDS, SocketLine, encode_socket_line,
    format_timestamp, parse_socket_line, parse_socket_line_with,
};
pub use payload::{
    FORM_CONTENT_TYPE, HttpPayload, JSON_CONTENT_TYPE, PayloadFormat, encode_http_payload,
};
pub use record::CORE_KEYS;
