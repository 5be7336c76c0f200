//! Wire formatters for attributes whose server representation differs from
//! the natural JSON one

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub trait Formatter {
    /// Wire value to client value. Values that cannot be decoded are left as-is.
    fn deserialize(value: &Value) -> Value;

    /// Client value to wire value
    fn serialize(attribute: &str, value: &Value) -> Result<Value>;
}

/// Booleans carried as `"true"` / `"false"` strings
pub struct BoolStr;

impl Formatter for BoolStr {
    fn deserialize(value: &Value) -> Value {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            other => other.clone(),
        }
    }

    fn serialize(attribute: &str, value: &Value) -> Result<Value> {
        match value {
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::String(s) if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") => {
                Ok(Value::String(s.to_ascii_lowercase()))
            },
            other => Err(Error::InvalidAttribute {
                attribute: attribute.to_string(),
                reason: format!("expected a boolean, got {}", other),
            }),
        }
    }
}

/// RFC 3339 timestamps, normalised to UTC
pub struct Iso8601;

impl Iso8601 {
    fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(ts.with_timezone(&Utc));
        }
        // several services omit the offset altogether
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn render(ts: DateTime<Utc>) -> Value {
        Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Formatter for Iso8601 {
    fn deserialize(value: &Value) -> Value {
        match value {
            Value::String(s) => Self::parse(s).map(Self::render).unwrap_or_else(|| value.clone()),
            other => other.clone(),
        }
    }

    fn serialize(attribute: &str, value: &Value) -> Result<Value> {
        let parsed = value.as_str().and_then(Self::parse);
        parsed.map(Self::render).ok_or_else(|| Error::InvalidAttribute {
            attribute: attribute.to_string(),
            reason: format!("expected an ISO 8601 timestamp, got {}", value),
        })
    }
}
