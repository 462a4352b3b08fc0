//! Response interpretation: error check, envelope shape, type rewriting.
//!
//! # Design
//! The body shape is resolved once into `ResponseShape` and each variant
//! knows where its payload, continuation link and count live. After
//! extraction the payload is rebuilt as `Value`, turning guid and date
//! strings into native values on the way.

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::date::{is_iso8601_date, is_verbose_date, parse_iso8601, parse_verbose_date};
use crate::error::{ODataError, MALFORMED_RESPONSE_MESSAGE};
use crate::guid::Guid;
use crate::normalize::{error_from_response, RawResponse, TransportStatus};
use crate::value::Value;

pub const VERBOSE_NEXT_FIELD: &str = "__next";
pub const VERBOSE_COUNT_FIELD: &str = "__count";
pub const LIGHT_NEXT_FIELD: &str = "@odata.nextLink";
pub const LIGHT_COUNT_FIELD: &str = "@odata.count";

const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected server response";

/// Controls the string rewriting pass.
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions<'a> {
    pub deserialize_dates: bool,
    /// Declared type per field name. A field declared `String` is never
    /// turned into a guid.
    pub field_types: Option<&'a HashMap<String, String>>,
}

impl Default for TransformOptions<'_> {
    fn default() -> Self {
        Self {
            deserialize_dates: true,
            field_types: None,
        }
    }
}

/// A successfully interpreted response.
///
/// `data` is `None` only for responses without content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub data: Option<Value>,
    pub next_url: Option<String>,
    pub count: Option<u64>,
}

/// The two JSON envelopes OData services answer with.
#[derive(Debug)]
pub enum ResponseShape {
    /// `{"d": ...}`, optionally `{"d": {"results": [...], "__next", "__count"}}`.
    Verbose(JsonValue),
    /// The body itself, optionally `{"value": [...], "@odata.nextLink", "@odata.count"}`.
    Light(JsonMap<String, JsonValue>),
}

impl ResponseShape {
    pub fn detect(mut body: JsonMap<String, JsonValue>) -> Self {
        match body.get("d") {
            Some(d) if d.is_array() || d.is_object() || d.is_null() => {
                ResponseShape::Verbose(body.remove("d").unwrap_or(JsonValue::Null))
            }
            _ => ResponseShape::Light(body),
        }
    }

    fn into_parts(self) -> Result<(JsonValue, Option<String>, Option<u64>), ODataError> {
        match self {
            ResponseShape::Verbose(JsonValue::Null) => {
                Err(ODataError::new(MALFORMED_RESPONSE_MESSAGE, 500))
            }
            ResponseShape::Verbose(mut d) => {
                let next_url = d.get(VERBOSE_NEXT_FIELD).and_then(JsonValue::as_str).map(str::to_string);
                let count = parse_count(d.get(VERBOSE_COUNT_FIELD));
                let wrapped = d.get("results").is_some_and(|results| !results.is_null());
                let data = if wrapped { d["results"].take() } else { d };
                Ok((data, next_url, count))
            }
            ResponseShape::Light(mut body) => {
                let next_url = body.get(LIGHT_NEXT_FIELD).and_then(JsonValue::as_str).map(str::to_string);
                let count = parse_count(body.get(LIGHT_COUNT_FIELD));
                let wrapped = body.get("value").is_some_and(|value| !value.is_null());
                let data = if wrapped { body["value"].take() } else { JsonValue::Object(body) };
                Ok((data, next_url, count))
            }
        }
    }
}

/// Turn a finished exchange into an `Envelope` or the error it describes.
pub fn interpret(response: RawResponse, options: &TransformOptions<'_>) -> Result<Envelope, ODataError> {
    if response.status == TransportStatus::NoContent {
        return Ok(Envelope::default());
    }
    if let Some(error) = error_from_response(&response) {
        return Err(error);
    }

    let body = match response.body {
        Some(body) => body,
        None if response.text.trim().is_empty() => JsonValue::Null,
        None => return Err(ODataError::new(UNEXPECTED_RESPONSE_MESSAGE, 500)),
    };

    let JsonValue::Object(object) = body else {
        return Ok(Envelope {
            data: Some(Value::from(body)),
            ..Envelope::default()
        });
    };

    let (payload, next_url, count) = ResponseShape::detect(object).into_parts()?;
    Ok(Envelope {
        data: Some(transform_types(payload, options)),
        next_url,
        count,
    })
}

/// Rebuild the extracted payload as `Value`, recognizing guid and date
/// strings. The payload itself is kept as is; only objects nested inside it
/// are replaced by their `results` collection.
pub fn transform_types(payload: JsonValue, options: &TransformOptions<'_>) -> Value {
    transform_children(payload, None, options)
}

fn transform_nested(json: JsonValue, key: Option<&str>, options: &TransformOptions<'_>) -> Value {
    match json {
        JsonValue::Object(mut map) if map.contains_key("results") => {
            let results = map.remove("results").unwrap_or(JsonValue::Null);
            transform_nested(results, key, options)
        }
        other => transform_children(other, key, options),
    }
}

fn transform_children(json: JsonValue, key: Option<&str>, options: &TransformOptions<'_>) -> Value {
    match json {
        JsonValue::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let value = transform_nested(v, Some(&k), options);
                    (k, value)
                })
                .collect(),
        ),
        JsonValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| transform_nested(item, None, options))
                .collect(),
        ),
        JsonValue::String(s) => transform_string(s, key, options),
        other => Value::from(other),
    }
}

fn transform_string(s: String, key: Option<&str>, options: &TransformOptions<'_>) -> Value {
    let declared_string = match (options.field_types, key) {
        (Some(types), Some(key)) => types.get(key).is_some_and(|t| t == "String"),
        _ => false,
    };

    if !declared_string && Guid::matches(&s) {
        if let Ok(guid) = s.parse() {
            return Value::Guid(guid);
        }
    }

    if options.deserialize_dates {
        let parsed = if is_verbose_date(&s) {
            parse_verbose_date(&s).ok()
        } else if is_iso8601_date(&s) {
            parse_iso8601(&s).ok()
        } else {
            None
        };
        if let Some(date) = parsed {
            return Value::DateTime(date);
        }
    }
    Value::String(s)
}

/// Integer prefix of a number or numeric string; negatives and garbage
/// count as absent.
fn parse_count(raw: Option<&JsonValue>) -> Option<u64> {
    match raw? {
        JsonValue::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        JsonValue::String(s) => {
            let trimmed = s.trim_start();
            let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
            let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}
