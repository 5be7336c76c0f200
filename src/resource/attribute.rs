//! Attribute descriptors
//!
//! An [`Attribute`] names one field of a resource type: the name callers use,
//! the wire name the server uses, which part of the request carries it, and
//! how its value is coerced.

use super::format::{BoolStr, Formatter, Iso8601};
use crate::error::{Error, Result};
use crate::utils::value_as_i64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which part of a request/response carries an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Body,
    Header,
    Uri,
}

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrType {
    #[default]
    Any,
    Bool,
    Int,
    Float,
    Str,
    Dict,
    List,
    BoolStr,
    Iso8601,
    /// Nested resource of the given schema key
    Resource(String),
}

impl FromStr for AttrType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let ty = match s {
            "any" => AttrType::Any,
            "bool" => AttrType::Bool,
            "int" => AttrType::Int,
            "float" => AttrType::Float,
            "str" => AttrType::Str,
            "dict" => AttrType::Dict,
            "list" => AttrType::List,
            "bool_str" => AttrType::BoolStr,
            "iso8601" => AttrType::Iso8601,
            other => match other.strip_prefix("resource:") {
                Some(key) if !key.is_empty() => AttrType::Resource(key.to_string()),
                _ => return Err(format!("unknown attribute type `{}`", other)),
            },
        };
        Ok(ty)
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Any => write!(f, "any"),
            AttrType::Bool => write!(f, "bool"),
            AttrType::Int => write!(f, "int"),
            AttrType::Float => write!(f, "float"),
            AttrType::Str => write!(f, "str"),
            AttrType::Dict => write!(f, "dict"),
            AttrType::List => write!(f, "list"),
            AttrType::BoolStr => write!(f, "bool_str"),
            AttrType::Iso8601 => write!(f, "iso8601"),
            AttrType::Resource(key) => write!(f, "resource:{}", key),
        }
    }
}

impl<'de> Deserialize<'de> for AttrType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for AttrType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One declared field of a resource type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attribute {
    /// Client-facing name; filled in from the schema map key
    #[serde(default, skip_serializing)]
    pub attr: String,
    /// Server-facing name, when it differs from `attr`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire: Option<String>,
    #[serde(default, rename = "in")]
    pub location: Location,
    #[serde(default, rename = "type")]
    pub kind: AttrType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub alternate_id: bool,
}

impl Attribute {
    pub fn new(attr: &str, location: Location) -> Self {
        Self {
            attr: attr.to_string(),
            location,
            ..Self::default()
        }
    }

    pub fn body(attr: &str) -> Self {
        Self::new(attr, Location::Body)
    }

    pub fn header(attr: &str) -> Self {
        Self::new(attr, Location::Header)
    }

    pub fn uri(attr: &str) -> Self {
        Self::new(attr, Location::Uri)
    }

    pub fn wire(mut self, wire: &str) -> Self {
        self.wire = Some(wire.to_string());
        self
    }

    pub fn kind(mut self, kind: AttrType) -> Self {
        self.kind = kind;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn alternate_id(mut self) -> Self {
        self.alternate_id = true;
        self
    }

    pub fn wire_name(&self) -> &str {
        self.wire.as_deref().unwrap_or(&self.attr)
    }

    fn is_default(&self, value: &Value) -> bool {
        self.default.as_ref() == Some(value)
    }

    /// Coerce a stored wire value into the declared type.
    ///
    /// Reads are lenient: a value that cannot be coerced is returned unchanged.
    pub fn deserialize_value(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match &self.kind {
            AttrType::Any | AttrType::Dict | AttrType::List => value.clone(),
            AttrType::Bool => match value {
                Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
                Value::Number(n) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
                other => other.clone(),
            },
            AttrType::Int => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
                other => value_as_i64(other).map(Value::from).unwrap_or_else(|| other.clone()),
            },
            AttrType::Float => match value {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| value.clone()),
                other => other.clone(),
            },
            AttrType::Str => match value {
                Value::Number(_) | Value::Bool(_) => Value::String(value.to_string()),
                other => other.clone(),
            },
            AttrType::BoolStr => BoolStr::deserialize(value),
            AttrType::Iso8601 => Iso8601::deserialize(value),
            AttrType::Resource(_) => match value {
                Value::Object(_) => value.clone(),
                other => {
                    let mut nested = Map::new();
                    nested.insert("id".to_string(), other.clone());
                    Value::Object(nested)
                },
            },
        }
    }

    /// Convert a client value into the wire representation, validating it.
    ///
    /// `null` and the declared default are stored without conversion.
    pub fn serialize_value(&self, value: Value) -> Result<Value> {
        if value.is_null() || self.is_default(&value) {
            return Ok(value);
        }
        let invalid = |expected: &str, value: &Value| Error::InvalidAttribute {
            attribute: self.attr.clone(),
            reason: format!("expected {}, got {}", expected, value),
        };

        match &self.kind {
            AttrType::Any => Ok(value),
            AttrType::Bool => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(invalid("a boolean", &value)),
            },
            AttrType::Int => match &value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
                Value::String(_) => value_as_i64(&value)
                    .map(Value::from)
                    .ok_or_else(|| invalid("an integer", &value)),
                _ => Err(invalid("an integer", &value)),
            },
            AttrType::Float => match &value {
                Value::Number(_) => Ok(value),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| invalid("a number", &value)),
                _ => Err(invalid("a number", &value)),
            },
            AttrType::Str => match &value {
                Value::String(_) => Ok(value),
                Value::Number(_) | Value::Bool(_) => Ok(Value::String(value.to_string())),
                _ => Err(invalid("a string", &value)),
            },
            AttrType::Dict => match &value {
                Value::Object(_) => Ok(value),
                _ => Err(invalid("an object", &value)),
            },
            AttrType::List => match &value {
                Value::Array(_) => Ok(value),
                _ => Err(invalid("a list", &value)),
            },
            AttrType::BoolStr => BoolStr::serialize(&self.attr, &value),
            AttrType::Iso8601 => Iso8601::serialize(&self.attr, &value),
            AttrType::Resource(key) => match &value {
                Value::Object(_) | Value::String(_) => Ok(value),
                _ => Err(invalid(&format!("a {} resource or id", key), &value)),
            },
        }
    }
}
