//! Verify serialization and response interpretation against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Literal vectors describe a typed value (or key) and the exact literal text
//! expected for a protocol version. Response vectors describe a finished
//! exchange and either the expected envelope or the expected error. Decoded
//! payloads are compared as JSON so dates and guids are checked in their
//! canonical text form.

use odata_core::date::parse_iso8601;
use odata_core::{
    interpret, serialize_key, serialize_value, EdmLiteral, Guid, HttpResponse, Key, PropName, ProtocolVersion,
    RawResponse, TransformOptions, Value,
};
use serde_json::Value as JsonValue;

fn version(case: &JsonValue) -> ProtocolVersion {
    let number = case["version"].as_u64().unwrap();
    ProtocolVersion::try_from(number as u8).unwrap()
}

/// Decode a typed value descriptor: `{"string": ..}`, `{"guid": ..}`,
/// `{"datetime": ..}`, `{"literal": ..}`, `{"array": [..]}` or `{"json": ..}`.
fn typed_value(desc: &JsonValue) -> Value {
    let (kind, raw) = desc.as_object().unwrap().iter().next().unwrap();
    match kind.as_str() {
        "string" => Value::from(raw.as_str().unwrap()),
        "guid" => Value::Guid(raw.as_str().unwrap().parse::<Guid>().unwrap()),
        "datetime" => Value::DateTime(parse_iso8601(raw.as_str().unwrap()).unwrap()),
        "literal" => Value::Literal(EdmLiteral::new(raw.as_str().unwrap())),
        "array" => Value::Array(raw.as_array().unwrap().iter().map(typed_value).collect()),
        "json" => Value::from(raw.clone()),
        other => panic!("unknown value kind: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

#[test]
fn value_literal_vectors() {
    let raw = include_str!("../../test-vectors/literals.json");
    let vectors: JsonValue = serde_json::from_str(raw).unwrap();

    for case in vectors["values"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let value = typed_value(&case["value"]);
        assert_eq!(
            serialize_value(&value, version(case)),
            case["expected"].as_str().unwrap(),
            "{name}"
        );
    }
}

#[test]
fn key_literal_vectors() {
    let raw = include_str!("../../test-vectors/literals.json");
    let vectors: JsonValue = serde_json::from_str(raw).unwrap();

    for case in vectors["keys"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let key = match case.get("composite") {
            Some(parts) => Key::Composite(
                parts
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|part| {
                        let part = part.as_array().unwrap();
                        (PropName::from(part[0].as_str().unwrap()), typed_value(&part[1]))
                    })
                    .collect(),
            ),
            None => Key::Scalar(typed_value(&case["key"])),
        };
        assert_eq!(
            serialize_key(&key, version(case)),
            case["expected"].as_str().unwrap(),
            "{name}"
        );
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: JsonValue = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = RawResponse::from_http(HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        });

        let result = interpret(response, &TransformOptions::default());

        if let Some(expected) = case.get("expected_error") {
            let err = result.expect_err(name);
            assert_eq!(err.message, expected["message"].as_str().unwrap(), "{name}: message");
            assert_eq!(
                u64::from(err.http_status),
                expected["http_status"].as_u64().unwrap(),
                "{name}: http_status"
            );
            continue;
        }

        let expected = &case["expected"];
        let envelope = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
        let data = envelope.data.as_ref().map_or(JsonValue::Null, Value::to_json);
        assert_eq!(data, expected["data"], "{name}: data");
        assert_eq!(envelope.next_url.as_deref(), expected["next_url"].as_str(), "{name}: next_url");
        assert_eq!(envelope.count, expected["count"].as_u64(), "{name}: count");
    }
}
