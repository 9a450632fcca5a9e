//! Attribute mapping shipped in HTTP payloads.
//!
//! Borrows from the record so the JSON and form encoders share one
//! field order without copying strings.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::thread::ThreadId;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

use crate::log_record::LogRecord;

/// Attribute names produced from the record schema itself.
pub const CORE_KEYS: [&str; 12] = [
    "name",
    "msg",
    "levelname",
    "levelno",
    "created",
    "msecs",
    "module",
    "filename",
    "lineno",
    "thread",
    "threadName",
    "process",
];

pub(super) struct RecordAttributes<'a> {
    pub(super) name: &'a str,
    pub(super) msg: Cow<'a, str>,
    pub(super) levelname: &'static str,
    pub(super) levelno: u8,
    pub(super) created: f64,
    pub(super) module: &'a str,
    pub(super) filename: &'a str,
    pub(super) lineno: u32,
    pub(super) thread_id: ThreadId,
    pub(super) thread_name: Option<&'a str>,
    pub(super) process: u32,
    pub(super) extra: &'a BTreeMap<String, Value>,
}

/// Scalar value of a core attribute, kept typed for JSON output.
pub(super) enum AttributeValue<'a> {
    Str(Cow<'a, str>),
    Float(f64),
    Int(u64),
    Json(&'a Value),
}

impl RecordAttributes<'_> {
    fn msecs(&self) -> f64 {
        (self.created - self.created.floor()) * 1000.0
    }

    fn thread_string(&self) -> String {
        format!("{:?}", self.thread_id)
    }

    /// Every attribute in wire order, extension entries last.
    pub(super) fn entries(&self) -> Vec<(&str, AttributeValue<'_>)> {
        let mut entries = vec![
            ("name", AttributeValue::Str(Cow::Borrowed(self.name))),
            ("msg", AttributeValue::Str(Cow::Borrowed(self.msg.as_ref()))),
            ("levelname", AttributeValue::Str(Cow::Borrowed(self.levelname))),
            ("levelno", AttributeValue::Int(u64::from(self.levelno))),
            ("created", AttributeValue::Float(self.created)),
            ("msecs", AttributeValue::Float(self.msecs())),
            ("module", AttributeValue::Str(Cow::Borrowed(self.module))),
            ("filename", AttributeValue::Str(Cow::Borrowed(self.filename))),
            ("lineno", AttributeValue::Int(u64::from(self.lineno))),
            ("thread", AttributeValue::Str(Cow::Owned(self.thread_string()))),
        ];
        if let Some(thread_name) = self.thread_name {
            entries.push(("threadName", AttributeValue::Str(Cow::Borrowed(thread_name))));
        }
        entries.push(("process", AttributeValue::Int(u64::from(self.process))));
        // Core attributes win over extension entries of the same name.
        let extra = self
            .extra
            .iter()
            .filter(|(key, _)| !CORE_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), AttributeValue::Json(value)));
        entries.extend(extra);
        entries
    }
}

impl<'a> From<&'a LogRecord> for RecordAttributes<'a> {
    fn from(record: &'a LogRecord) -> Self {
        let metadata = &record.metadata;
        Self {
            name: &record.name,
            msg: record.message.render(),
            levelname: record.level.as_str(),
            levelno: record.level.number(),
            created: record.created_or_now(),
            module: &metadata.module_path,
            filename: &metadata.filename,
            lineno: metadata.line_number,
            thread_id: metadata.thread_id,
            thread_name: metadata.thread_name.as_deref(),
            process: metadata.process_id,
            extra: &record.extra,
        }
    }
}

impl Serialize for AttributeValue<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AttributeValue::Str(s) => serializer.serialize_str(s),
            AttributeValue::Float(f) => serializer.serialize_f64(*f),
            AttributeValue::Int(i) => serializer.serialize_u64(*i),
            AttributeValue::Json(v) => v.serialize(serializer),
        }
    }
}

impl Serialize for RecordAttributes<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
