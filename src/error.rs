//! Error types
//!
//! Every fallible SDK operation returns [`Error`]. HTTP failures are surfaced as
//! [`Error::Http`] (or [`Error::NotFound`] for 404) carrying the code/message pair
//! found in the server's error body.

use regex::Regex;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::OnceLock;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Keys that may hold an error code in a JSON error body
const CODE_KEYS: &[&str] = &["code", "errorCode", "errCode", "error_code"];

/// Keys that may hold an error message in a JSON error body
const MESSAGE_KEYS: &[&str] = &[
    "message",
    "error_message",
    "externalMessage",
    "error_msg",
    "details",
    "NeutronError",
    "computeFault",
    "TackerError",
    "error",
];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The {method} method is not supported for {resource}")]
    MethodNotSupported {
        resource: String,
        method: &'static str,
    },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown attribute `{attribute}` for {resource}")]
    UnknownAttribute { resource: String, attribute: String },
    #[error("Invalid value for `{attribute}`: {reason}")]
    InvalidAttribute { attribute: String, reason: String },
    #[error("{0}")]
    ResourceNotFound(String),
    #[error("{0}")]
    DuplicateResource(String),
    #[error("{0}")]
    ResourceTimeout(String),
    #[error("{0}")]
    ResourceFailure(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid resource definition: {0}")]
    Registry(String),
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),
    #[error("NotFoundException: {0}")]
    NotFound(HttpError),
    #[error("HttpException: {0}")]
    Http(HttpError),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for HTTP 404 responses and failed name-or-id lookups
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::ResourceNotFound(_))
    }

    /// HTTP status code, if the error came from a server response
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound(e) | Error::Http(e) => Some(e.status),
            _ => None,
        }
    }

    pub(crate) fn method_not_supported(resource: &str, method: &'static str) -> Self {
        Error::MethodNotSupported {
            resource: resource.to_string(),
            method,
        }
    }
}

/// Details of a failed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub method: String,
    pub url: String,
    pub request_id: Option<String>,
    /// Server-provided error code, when one was detected
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            write!(f, ", {}", details)?;
        }
        Ok(())
    }
}

/// Build an [`Error`] from a non-success response
pub fn from_response(
    method: &str,
    url: &str,
    status: u16,
    headers: &HeaderMap,
    body: &[u8],
) -> Error {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let generic = format!("{} (HTTP {})", reason, status);

    let request_id = ["x-openstack-request-id", "x-request-id", "x-compute-request-id"]
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let text = String::from_utf8_lossy(body).to_string();

    let mut code = None;
    let mut message = generic.clone();
    let mut details = if text.is_empty() { None } else { Some(text.clone()) };

    if !body.is_empty() && content_type.contains("application/json") {
        if let Ok(json) = serde_json::from_slice::<Value>(body) {
            let (detected_code, detected_message) = detect_json_error(&json);
            if !detected_message.is_empty() {
                message = detected_message.clone();
            }
            if !detected_code.is_empty() {
                code = Some(detected_code.clone());
            }
            details = Some(format_details(&detected_code, &detected_message));
        }
    } else if !body.is_empty() && content_type.contains("text/html") {
        details = Some(strip_html(&text));
    }

    let err = HttpError {
        status,
        method: method.to_string(),
        url: url.to_string(),
        request_id,
        code,
        message,
        details,
    };

    if status == 404 {
        Error::NotFound(err)
    } else {
        Error::Http(err)
    }
}

fn format_details(code: &str, message: &str) -> String {
    if code.is_empty() {
        message.to_string()
    } else {
        format!("[{}]{}", code, message)
    }
}

/// Find the (code, message) pair in a decoded error body.
///
/// The top-level object is searched first; if it yields neither a code nor a
/// message, each nested object is searched in turn.
pub fn detect_json_error(body: &Value) -> (String, String) {
    let (code, message) = walk_error_fields(body);
    if !code.is_empty() || !message.is_empty() {
        return (code, message);
    }

    if let Value::Object(map) = body {
        for nested in map.values().filter(|v| v.is_object()) {
            let (code, message) = walk_error_fields(nested);
            if !code.is_empty() || !message.is_empty() {
                return (code, message);
            }
        }
    }

    (String::new(), String::new())
}

fn walk_error_fields(root: &Value) -> (String, String) {
    let mut code = String::new();
    let mut message = String::new();

    if !root.is_object() {
        return (code, message);
    }

    let mut queue: VecDeque<&Value> = VecDeque::from([root]);
    while let Some(Value::Object(node)) = queue.pop_back() {
        for (key, value) in node {
            let is_code = CODE_KEYS.contains(&key.as_str());
            let is_message = MESSAGE_KEYS.contains(&key.as_str());

            if is_code {
                if value.is_object() {
                    queue.push_back(value);
                } else if code.is_empty() {
                    code = scalar_to_string(value);
                }
            }
            if is_message {
                if value.is_object() {
                    queue.push_back(value);
                } else if message.is_empty() {
                    message = scalar_to_string(value);
                }
            }
            if !is_code && !is_message && value.is_object() {
                queue.push_back(value);
            }
        }
        if !code.is_empty() && !message.is_empty() {
            break;
        }
    }

    (code, message)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Collapse an HTML error page into a single `": "`-joined line
pub fn strip_html(text: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    for line in text.lines() {
        let stripped = strip_tags(line.trim());
        let stripped = stripped.trim();
        if stripped.is_empty() {
            continue;
        }
        if !seen.iter().any(|s| s == stripped) {
            seen.push(stripped.to_string());
        }
    }
    seen.join(": ")
}

fn strip_tags(line: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<.+?>").expect("tag pattern is valid"))
        .replace_all(line, "")
        .into_owned()
}
