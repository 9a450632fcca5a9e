//! HTTP payload encoding.

use serde_json::Value;

use super::record::{AttributeValue, RecordAttributes};
use super::url_encoding::FormBody;
use crate::log_record::LogRecord;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body format of an HTTP delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    UrlEncoded,
    #[default]
    Json,
}

impl PayloadFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            PayloadFormat::UrlEncoded => FORM_CONTENT_TYPE,
            PayloadFormat::Json => JSON_CONTENT_TYPE,
        }
    }
}

/// Encoded body together with its content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpPayload {
    pub content_type: &'static str,
    pub body: String,
}

fn form_value(value: &AttributeValue<'_>) -> String {
    match value {
        AttributeValue::Str(s) => s.to_string(),
        AttributeValue::Float(f) => format!("{f:?}"),
        AttributeValue::Int(i) => i.to_string(),
        AttributeValue::Json(Value::String(s)) => s.clone(),
        AttributeValue::Json(other) => other.to_string(),
    }
}

/// Encode the complete attribute mapping of `record`.
///
/// Nothing is filtered: every core attribute and every extension entry is
/// sent.
///
/// # Errors
///
/// Returns the serializer error if JSON encoding fails.
pub fn encode_http_payload(
    record: &LogRecord,
    format: PayloadFormat,
) -> Result<HttpPayload, serde_json::Error> {
    let attributes = RecordAttributes::from(record);
    let body = match format {
        PayloadFormat::Json => serde_json::to_string(&attributes)?,
        PayloadFormat::UrlEncoded => {
            let mut body = FormBody::default();
            for (key, value) in attributes.entries() {
                body.push(key, &form_value(&value));
            }
            body.finish()
        }
    };
    Ok(HttpPayload {
        content_type: format.content_type(),
        body,
    })
}
