//! Folds transport failures and protocol-level error bodies into `ODataError`.
//!
//! # Design
//! Servers report failures in several places: the HTTP status, an `error`
//! object inside an otherwise successful body (`error`, `odata.error` or
//! `@odata.error`), and .NET-style `innererror`/`internalexception` chains
//! whose most useful message is buried a few levels down. The normalizer
//! reads all of them and produces at most one error.

use serde_json::Value as JsonValue;

use crate::error::{ODataError, UNKNOWN_ERROR_MESSAGE};
use crate::transport::{HttpResponse, TransportError};

const ERROR_KEYS: [&str; 3] = ["error", "odata.error", "@odata.error"];

/// How the exchange ended, before looking at the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    Success,
    /// 204: success with nothing to read.
    NoContent,
    /// A response with a non-2xx status.
    HttpFailure(u16),
    /// No response at all.
    Failed(TransportError),
}

impl TransportStatus {
    pub fn classify(status: u16) -> Self {
        match status {
            204 => TransportStatus::NoContent,
            200..=299 => TransportStatus::Success,
            other => TransportStatus::HttpFailure(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransportStatus::Success | TransportStatus::NoContent)
    }

    fn http_status(&self) -> u16 {
        match self {
            TransportStatus::Success | TransportStatus::NoContent => 200,
            TransportStatus::HttpFailure(status) => *status,
            TransportStatus::Failed(_) => 0,
        }
    }

    fn message(&self) -> String {
        match self {
            TransportStatus::Success | TransportStatus::NoContent => UNKNOWN_ERROR_MESSAGE.to_string(),
            TransportStatus::HttpFailure(status) if *status >= 400 => http::StatusCode::from_u16(*status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .map_or_else(|| format!("HTTP {status}"), str::to_string),
            TransportStatus::HttpFailure(_) => "Unspecified network error".to_string(),
            TransportStatus::Failed(TransportError::Timeout) => "Network connection timeout".to_string(),
            TransportStatus::Failed(TransportError::Network(_)) => "Unspecified network error".to_string(),
            TransportStatus::Failed(other) => capitalize(&other.to_string()),
        }
    }
}

/// A finished exchange as the interpreter sees it.
///
/// `body` holds the parsed JSON when the text was JSON; `text` is kept for
/// messages and for detecting unparseable success bodies.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: TransportStatus,
    pub body: Option<JsonValue>,
    pub text: String,
}

impl RawResponse {
    pub fn from_http(response: HttpResponse) -> Self {
        let body = serde_json::from_str(&response.body).ok();
        Self {
            status: TransportStatus::classify(response.status),
            body,
            text: response.body,
        }
    }

    pub fn from_transport_error(error: TransportError) -> Self {
        Self {
            status: TransportStatus::Failed(error),
            body: None,
            text: String::new(),
        }
    }
}

/// Extract the error described by `response`, if any.
pub fn error_from_response(response: &RawResponse) -> Option<ODataError> {
    if response.status == TransportStatus::NoContent {
        return None;
    }

    let mut http_status = response.status.http_status();
    let mut message = response.status.message();

    match response.body.as_ref().and_then(find_error_object) {
        Some(error_obj) => {
            if let Some(detail) = error_message(error_obj) {
                message = detail;
            }
            if http_status == 200 {
                http_status = 500;
            }
            if let Some(code) = error_code(error_obj) {
                http_status = code;
            }
            Some(ODataError::new(message, http_status).with_details(error_obj.clone()))
        }
        None if http_status != 200 => Some(ODataError::new(message, http_status)),
        None => None,
    }
}

fn find_error_object(body: &JsonValue) -> Option<&JsonValue> {
    ERROR_KEYS
        .iter()
        .filter_map(|key| body.get(key))
        .find(|candidate| is_truthy(candidate))
}

/// Walk `message`, then the `innererror`/`internalexception` chain.
///
/// Each inner node replaces the message. The walk stops at a node that has
/// its own `internalexception` but whose message does not point to it
/// ("See the inner exception for details.").
fn error_message(error_obj: &JsonValue) -> Option<String> {
    let mut message = error_obj.get("message").and_then(message_text);
    let mut current = error_obj;

    while let Some(inner) = child(current, "innererror").or_else(|| child(current, "internalexception")) {
        message = inner.get("message").and_then(message_text);
        current = inner;
        let has_internal = child(current, "internalexception").is_some();
        if has_internal && message.as_deref().is_some_and(|m| !m.contains("inner exception")) {
            break;
        }
    }
    message
}

fn child<'a>(node: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    node.get(key).filter(|value| is_truthy(value))
}

// `{"lang": "en-US", "value": "..."}` or a bare string.
fn message_text(message: &JsonValue) -> Option<String> {
    match message {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(_) => match message.get("value") {
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn error_code(error_obj: &JsonValue) -> Option<u16> {
    match error_obj.get("code")? {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
