//! Serialization of values and keys into OData literal syntax.
//!
//! # Design
//! Version-specific syntax comes from the `Dialect` table; this module only
//! decides which kind of value it holds. Nothing here mutates its input.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::error::Error;
use crate::guid::Guid;
use crate::value::{EdmLiteral, Value};
use crate::version::ProtocolVersion;

/// Serialize `value` as a literal for `$filter` expressions and keys.
pub fn serialize_value(value: &Value, version: ProtocolVersion) -> String {
    let dialect = version.dialect();
    match value {
        Value::Literal(literal) => literal.as_str().to_string(),
        Value::String(s) => serialize_string(s),
        Value::DateTime(date) => (dialect.date_literal)(date),
        Value::Guid(guid) => (dialect.guid_literal)(guid),
        Value::Array(items) if dialect.array_literals => {
            let parts: Vec<String> = items.iter().map(|item| serialize_value(item, version)).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

fn serialize_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Property name inside a composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropName {
    /// Dotted path through complex types, written with `/`.
    Path(String),
    /// Written verbatim.
    Literal(EdmLiteral),
}

impl From<&str> for PropName {
    fn from(name: &str) -> Self {
        PropName::Path(name.to_string())
    }
}

impl From<String> for PropName {
    fn from(name: String) -> Self {
        PropName::Path(name)
    }
}

impl From<EdmLiteral> for PropName {
    fn from(literal: EdmLiteral) -> Self {
        PropName::Literal(literal)
    }
}

pub fn serialize_prop_name(name: &PropName) -> String {
    match name {
        PropName::Path(path) => path.replace('.', "/"),
        PropName::Literal(literal) => literal.as_str().to_string(),
    }
}

/// Entity key: a single value or named parts in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Scalar(Value),
    Composite(Vec<(PropName, Value)>),
}

impl Key {
    pub fn composite<N, V>(parts: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<PropName>,
        V: Into<Value>,
    {
        Key::Composite(
            parts
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key::Scalar(value)
    }
}

macro_rules! scalar_key_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                Key::Scalar(Value::from(value))
            }
        })*
    };
}

scalar_key_from!(&str, String, i32, i64, Guid, EdmLiteral, DateTime<FixedOffset>);

/// Serialize `key` as it appears between the parentheses of `Entity(...)`.
pub fn serialize_key(key: &Key, version: ProtocolVersion) -> String {
    match key {
        Key::Scalar(value) => serialize_value(value, version),
        Key::Composite(parts) => parts
            .iter()
            .map(|(name, value)| {
                format!("{}={}", serialize_prop_name(name), serialize_value(value, version))
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// EDM primitive types that have a key converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdmType {
    String,
    Int32,
    Int64,
    Guid,
    Boolean,
    Single,
    Decimal,
}

impl FromStr for EdmType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "String" => Ok(EdmType::String),
            "Int32" => Ok(EdmType::Int32),
            "Int64" => Ok(EdmType::Int64),
            "Guid" => Ok(EdmType::Guid),
            "Boolean" => Ok(EdmType::Boolean),
            "Single" => Ok(EdmType::Single),
            "Decimal" => Ok(EdmType::Decimal),
            other => Err(Error::UnknownKeyType(other.to_string())),
        }
    }
}

impl EdmType {
    /// Coerce `value` to this type's wire representation.
    pub fn convert(self, value: Value) -> Result<Value, Error> {
        match self {
            EdmType::String => Ok(Value::String(value.to_string())),
            EdmType::Int32 => {
                let n = to_number(&value).ok_or_else(|| Error::NotANumber(value.to_string()))?;
                Ok(Value::from(n.floor() as i64))
            }
            EdmType::Int64 => Ok(suffixed_literal(value, 'L')),
            EdmType::Guid => match value {
                Value::Guid(_) => Ok(value),
                Value::String(s) => Guid::from_str(&s).map(Value::Guid),
                other => Err(Error::InvalidGuid(other.to_string())),
            },
            EdmType::Boolean => Ok(Value::Bool(is_truthy(&value))),
            EdmType::Single => Ok(suffixed_literal(value, 'f')),
            EdmType::Decimal => Ok(suffixed_literal(value, 'm')),
        }
    }
}

/// Convert `value` to the EDM type named `type_name`.
pub fn convert_primitive_value(type_name: &str, value: Value) -> Result<Value, Error> {
    type_name.parse::<EdmType>()?.convert(value)
}

fn suffixed_literal(value: Value, suffix: char) -> Value {
    match value {
        Value::Literal(_) => value,
        other => Value::Literal(EdmLiteral::new(format!("{other}{suffix}"))),
    }
}

fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
