//! Pipe-delimited line format used by the socket protocol.
//!
//! A line has six fields in fixed order:
//!
//! ```text
//! timestamp|hostname|path|logger|level|message
//! ```
//!
//! With [`PipeEscaping::MessageOnly`] (the wire default) only the message has
//! its pipes escaped as `\|`. A pipe inside any other field therefore shifts
//! the field count seen by the collector; [`parse_socket_line`] reports that
//! as [`LineParseError::FieldCount`] rather than guessing.
//!
//! [`PipeEscaping::AllFields`] escapes backslashes as `\\` and pipes as `\|`
//! in every field, so any field content survives
//! [`parse_socket_line_with`].

use std::borrow::Cow;

use thiserror::Error;

use crate::log_record::LogRecord;

/// Number of fields in a socket line.
pub const SOCKET_LINE_FIELDS: usize = 6;

/// Which fields have literal pipes escaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipeEscaping {
    /// Only the message field, as existing collectors expect.
    #[default]
    MessageOnly,
    /// Every field, backslashes included. Collectors must unescape all
    /// fields.
    AllFields,
}

/// Render a timestamp the way the line protocol always has: a decimal with
/// at least one fractional digit (`1620000000.0`).
pub fn format_timestamp(seconds: f64) -> String {
    format!("{seconds:?}")
}

fn escape_pipes(field: &str) -> Cow<'_, str> {
    if field.contains('|') {
        Cow::Owned(field.replace('|', "\\|"))
    } else {
        Cow::Borrowed(field)
    }
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(['\\', '|']) {
        Cow::Owned(field.replace('\\', "\\\\").replace('|', "\\|"))
    } else {
        Cow::Borrowed(field)
    }
}

/// Encode `record` as a single socket line without a terminator.
pub fn encode_socket_line(
    record: &LogRecord,
    hostname: &str,
    path: &str,
    escaping: PipeEscaping,
) -> String {
    let timestamp = format_timestamp(record.created_or_now());
    let message = record.message.render();
    let level = record.level.as_str();
    let fields: [Cow<'_, str>; SOCKET_LINE_FIELDS] = match escaping {
        PipeEscaping::MessageOnly => [
            Cow::Owned(timestamp),
            Cow::Borrowed(hostname),
            Cow::Borrowed(path),
            Cow::Borrowed(record.name.as_str()),
            Cow::Borrowed(level),
            Cow::Owned(escape_pipes(&message).into_owned()),
        ],
        PipeEscaping::AllFields => [
            Cow::Owned(timestamp),
            escape_field(hostname),
            escape_field(path),
            escape_field(&record.name),
            Cow::Borrowed(level),
            Cow::Owned(escape_field(&message).into_owned()),
        ],
    };
    fields.join("|")
}

/// A socket line split back into its fields.
#[derive(Clone, Debug, PartialEq)]
pub struct SocketLine {
    /// Timestamp exactly as sent.
    pub timestamp: String,
    /// Hostname of the sending machine.
    pub hostname: String,
    /// Path tag configured on the sending handler.
    pub path: String,
    /// Dotted logger name.
    pub logger: String,
    /// Level name such as `INFO`.
    pub level: String,
    /// Rendered message with escapes removed.
    pub message: String,
}

impl SocketLine {
    /// Parse the timestamp field as seconds since the epoch.
    pub fn created(&self) -> Option<f64> {
        self.timestamp.parse().ok()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineParseError {
    #[error("expected {SOCKET_LINE_FIELDS} fields, found {0}")]
    FieldCount(usize),
}

/// Split on unescaped pipes.
///
/// `\|` always stands for a literal pipe. Under [`PipeEscaping::AllFields`]
/// `\\` stands for a literal backslash; otherwise backslashes are literal.
fn split_unescaped(line: &str, escaping: PipeEscaping) -> Vec<String> {
    let mut fields = Vec::with_capacity(SOCKET_LINE_FIELDS);
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        match (ch, next, escaping) {
            ('\\', Some('|'), _) | ('\\', Some('\\'), PipeEscaping::AllFields) => {
                current.extend(chars.next());
            }
            ('|', _, _) => fields.push(std::mem::take(&mut current)),
            (other, _, _) => current.push(other),
        }
    }
    fields.push(current);
    fields
}

/// Parse a line sent with the default [`PipeEscaping::MessageOnly`].
///
/// # Errors
///
/// Returns [`LineParseError::FieldCount`] when the line does not split into
/// exactly six fields, which happens when an unescaped field contains a pipe.
pub fn parse_socket_line(line: &str) -> Result<SocketLine, LineParseError> {
    parse_socket_line_with(line, PipeEscaping::MessageOnly)
}

/// Parse a line sent with the given escaping mode.
///
/// # Errors
///
/// Returns [`LineParseError::FieldCount`] when the line does not split into
/// exactly six fields.
pub fn parse_socket_line_with(
    line: &str,
    escaping: PipeEscaping,
) -> Result<SocketLine, LineParseError> {
    let fields = split_unescaped(line, escaping);
    let count = fields.len();
    let Ok([timestamp, hostname, path, logger, level, message]) =
        <[String; SOCKET_LINE_FIELDS]>::try_from(fields)
    else {
        return Err(LineParseError::FieldCount(count));
    };
    Ok(SocketLine {
        timestamp,
        hostname,
        path,
        logger,
        level,
        message,
    })
}
