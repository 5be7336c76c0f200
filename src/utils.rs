//! Small URL and value helpers shared by the session and resource layers

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Join path pieces with `/`, trimming slashes from each piece.
///
/// Unlike `url::Url::join` this never treats a piece as an absolute reference.
pub fn urljoin<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref().trim_matches('/'))
        .collect::<Vec<_>>()
        .join("/")
}

/// Render a JSON value the way it appears in a URL or header
pub fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Python-style truthiness used by the pagination cursor checks
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Interpret a value as an integer, accepting numeric strings
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `{name}` placeholder in a path template
fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"))
}

/// Fill `{name}` placeholders in a path template.
///
/// Each value is percent-encoded so it stays a single path segment.
pub fn fill_template(template: &str, values: &Map<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder().captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = values
            .get(name.as_str())
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "Missing value for `{}` in path template {}",
                    name.as_str(),
                    template
                ))
            })?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&urlencoding::encode(&value_to_param(value)));
        last = whole.end();
    }

    let rest = &template[last..];
    if rest.contains('{') {
        return Err(Error::InvalidRequest(format!(
            "Unterminated placeholder in path template {}",
            template
        )));
    }
    out.push_str(rest);

    Ok(out)
}

/// Names of the `{placeholders}` in a path template
pub fn template_fields(template: &str) -> Vec<&str> {
    placeholder()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Flatten a query map into `(key, value)` pairs, repeating keys for arrays
pub fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(query.len());
    for (key, value) in query {
        match value {
            Value::Null => {},
            Value::Array(items) => {
                pairs.extend(items.iter().map(|v| (key.clone(), value_to_param(v))));
            },
            other => pairs.push((key.clone(), value_to_param(other))),
        }
    }
    pairs
}
