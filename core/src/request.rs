//! Request descriptors, per-call options and payload encoding.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::interpret::TransformOptions;
use crate::value::Value;
use crate::version::ProtocolVersion;

/// Timeout applied when neither the request nor the client configuration
/// sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// What the caller wants sent. Built fresh per call.
///
/// `params` become the query string. `payload` is ignored for GET.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub payload: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// `None` means the client's configured timeout.
    pub timeout: Option<Duration>,
    pub asynchronous: bool,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: "get".to_string(),
            url: String::new(),
            params: BTreeMap::new(),
            payload: None,
            headers: Vec::new(),
            timeout: None,
            asynchronous: true,
        }
    }
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Hook run on the merged request before it is turned into an `HttpRequest`.
pub type BeforeSend = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Per-call options. Read-only for the duration of one `send`.
#[derive(Clone)]
pub struct RequestOptions {
    pub before_send: Option<BeforeSend>,
    /// Use JSONP for GET requests.
    pub jsonp: bool,
    pub with_credentials: bool,
    /// Turn date strings in responses into `Value::DateTime`.
    pub deserialize_dates: bool,
    /// Declared EDM type per field; `"String"` suppresses guid detection.
    pub field_types: HashMap<String, String>,
    /// Resolve with the total count only.
    pub count_only: bool,
    /// The caller pages itself; continuation links are not followed.
    pub is_paged: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            before_send: None,
            jsonp: false,
            with_credentials: false,
            deserialize_dates: true,
            field_types: HashMap::new(),
            count_only: false,
            is_paged: false,
        }
    }
}

impl RequestOptions {
    pub fn before_send(mut self, hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        self.before_send = Some(Arc::new(hook));
        self
    }

    pub fn field_type(mut self, field: impl Into<String>, edm_type: impl Into<String>) -> Self {
        self.field_types.insert(field.into(), edm_type.into());
        self
    }

    pub fn transform_options(&self) -> TransformOptions<'_> {
        TransformOptions {
            deserialize_dates: self.deserialize_dates,
            field_types: (!self.field_types.is_empty()).then_some(&self.field_types),
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("before_send", &self.before_send.as_ref().map(|_| "<hook>"))
            .field("jsonp", &self.jsonp)
            .field("with_credentials", &self.with_credentials)
            .field("deserialize_dates", &self.deserialize_dates)
            .field("field_types", &self.field_types)
            .field("count_only", &self.count_only)
            .field("is_paged", &self.is_paged)
            .finish()
    }
}

/// Encode `payload` as a JSON request body.
///
/// Dates use the version's payload format, guids and literals become their
/// string forms; everything else maps to JSON directly.
pub fn encode_payload(payload: &Value, version: ProtocolVersion) -> Result<String, Error> {
    let json = payload_to_json(payload, version);
    serde_json::to_string(&json).map_err(|e| Error::Serialization(e.to_string()))
}

fn payload_to_json(value: &Value, version: ProtocolVersion) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(n.clone()),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::DateTime(date) => serde_json::Value::String((version.dialect().payload_date)(date)),
        Value::Guid(guid) => serde_json::Value::String(guid.to_string()),
        Value::Literal(literal) => serde_json::Value::String(literal.as_str().to_string()),
        Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|item| payload_to_json(item, version)).collect(),
        ),
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), payload_to_json(v, version)))
                .collect(),
        ),
    }
}

/// Append `params` to `url` as a form-encoded query string.
pub fn append_query(url: &str, params: &BTreeMap<String, String>) -> Result<String, Error> {
    if params.is_empty() {
        return Ok(url.to_string());
    }
    let query = serde_urlencoded::to_string(params).map_err(|e| Error::Serialization(e.to_string()))?;
    let separator = if url.contains('?') { '&' } else { '?' };
    Ok(format!("{url}{separator}{query}"))
}
