//! Log record representation shipped by the transports.
//!
//! [`LogRecord`] is an explicit schema: the fields every collector relies on
//! (logger name, level, message, creation time) plus source metadata and an
//! open [`extra`](LogRecord::extra) map for anything application specific.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::thread::{self, ThreadId};

use chrono::Utc;
use serde_json::Value;

use crate::level::LogLevel;

/// Placeholder substituted when a byte message is not valid UTF-8.
pub const BYTES_PLACEHOLDER: &str = "<bytes>";

/// Seconds since the Unix epoch with microsecond precision.
pub fn now_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Message payload of a record.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordMessage {
    Text(String),
    /// Fragments rendered joined by a single space.
    Parts(Vec<String>),
    /// Raw bytes; rendered as UTF-8 when possible.
    Bytes(Vec<u8>),
}

impl RecordMessage {
    /// Render the message as text.
    ///
    /// Never fails: bytes that are not valid UTF-8 render as
    /// [`BYTES_PLACEHOLDER`].
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            RecordMessage::Text(text) => Cow::Borrowed(text),
            RecordMessage::Parts(parts) => Cow::Owned(parts.join(" ")),
            RecordMessage::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Cow::Borrowed(text),
                Err(_) => Cow::Borrowed(BYTES_PLACEHOLDER),
            },
        }
    }
}

impl Default for RecordMessage {
    fn default() -> Self {
        RecordMessage::Text(String::new())
    }
}

impl From<&str> for RecordMessage {
    fn from(value: &str) -> Self {
        RecordMessage::Text(value.to_owned())
    }
}

impl From<String> for RecordMessage {
    fn from(value: String) -> Self {
        RecordMessage::Text(value)
    }
}

impl From<Vec<String>> for RecordMessage {
    fn from(value: Vec<String>) -> Self {
        RecordMessage::Parts(value)
    }
}

impl From<Vec<u8>> for RecordMessage {
    fn from(value: Vec<u8>) -> Self {
        RecordMessage::Bytes(value)
    }
}

/// Additional context associated with a log record.
#[derive(Clone, Debug)]
pub struct RecordMetadata {
    /// Rust module path where the log call originated.
    pub module_path: String,
    /// Source file name for the log call.
    pub filename: String,
    /// Line number in the source file.
    pub line_number: u32,
    /// ID of the thread that created the record.
    pub thread_id: ThreadId,
    /// Name of the thread that created the record (if any).
    pub thread_name: Option<String>,
    /// ID of the emitting process.
    pub process_id: u32,
}

impl Default for RecordMetadata {
    fn default() -> Self {
        let current = thread::current();
        Self {
            module_path: String::new(),
            filename: String::new(),
            line_number: 0,
            thread_id: current.id(),
            thread_name: current.name().map(ToString::to_string),
            process_id: std::process::id(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Name of the logger that created this record.
    pub name: String,
    pub level: LogLevel,
    pub message: RecordMessage,
    /// Creation time in seconds since the epoch. `None` means "now" at
    /// encoding time.
    pub created: Option<f64>,
    pub metadata: RecordMetadata,
    /// Application-defined attributes shipped alongside the core fields.
    pub extra: BTreeMap<String, Value>,
}

impl LogRecord {
    /// Construct a record stamped with the current time.
    pub fn new(name: &str, level: LogLevel, message: impl Into<RecordMessage>) -> Self {
        Self {
            name: name.to_owned(),
            level,
            message: message.into(),
            created: Some(now_seconds()),
            metadata: RecordMetadata::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Construct a record with explicit source metadata.
    pub fn with_metadata(
        name: &str,
        level: LogLevel,
        message: impl Into<RecordMessage>,
        metadata: RecordMetadata,
    ) -> Self {
        Self {
            metadata,
            ..Self::new(name, level, message)
        }
    }

    /// Override the creation time.
    pub fn created_at(mut self, seconds: f64) -> Self {
        self.created = Some(seconds);
        self
    }

    /// Attach an extension attribute.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Creation time, falling back to the current time.
    pub fn created_or_now(&self) -> f64 {
        self.created.unwrap_or_else(now_seconds)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message.render())
    }
}
