//! Values exchanged with an OData service.
//!
//! # Design
//! `Value` is JSON plus the three kinds JSON cannot express natively: dates,
//! guids and pre-formatted `EdmLiteral`s. It is the serializer's input, the
//! request payload type and what response payloads decode into. Objects keep
//! insertion order so composite keys and echoed entities stay stable.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;

use crate::date::format_iso8601;
use crate::guid::Guid;

/// Ordered property map.
pub type Map = IndexMap<String, Value>;

/// A pre-formatted wire literal that bypasses value escaping, e.g. `123L`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdmLiteral(String);

impl EdmLiteral {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdmLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    DateTime(DateTime<FixedOffset>),
    Guid(Guid),
    Literal(EdmLiteral),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<&Guid> {
        match self {
            Value::Guid(guid) => Some(guid),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Property lookup on objects; `None` for everything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?.get(key)
    }
}

/// The plain string conversion used for values without a dedicated literal
/// form: `true`, `42`, `1.5`, `null`, arrays comma-joined.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::DateTime(date) => f.write_str(&format_iso8601(date, false, false)),
            Value::Guid(guid) => write!(f, "{guid}"),
            Value::Literal(literal) => f.write_str(literal.as_str()),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(map) => {
                let json = serde_json::Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect(),
                );
                write!(f, "{json}")
            }
        }
    }
}

impl Value {
    /// Plain JSON view: dates as ISO-8601 with offset, guids and literals as
    /// strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(date) => serde_json::Value::String(format_iso8601(date, false, false)),
            Value::Guid(guid) => serde_json::Value::String(guid.to_string()),
            Value::Literal(literal) => serde_json::Value::String(literal.as_str().to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

/// Non-finite floats become `Null`, as in JSON.
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(date: DateTime<FixedOffset>) -> Self {
        Value::DateTime(date)
    }
}

impl From<Guid> for Value {
    fn from(guid: Guid) -> Self {
        Value::Guid(guid)
    }
}

impl From<EdmLiteral> for Value {
    fn from(literal: EdmLiteral) -> Self {
        Value::Literal(literal)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}
