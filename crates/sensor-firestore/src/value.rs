//! Conversion between plain JSON and Firestore's typed `Value` encoding.
//!
//! Firestore's REST API wraps every value in a one-key object naming its
//! type (`{"integerValue": "42"}`, `{"mapValue": {"fields": {..}}}`).

use serde_json::{Map, Number, Value, json};

use crate::error::FirestoreError;

/// Encode a JSON object as a Firestore `fields` map.
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Encode one JSON value as a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n.as_f64() }),
            |i| json!({ "integerValue": i.to_string() }),
        ),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decode a Firestore `fields` map back into plain JSON.
pub fn decode_fields(fields: Map<String, Value>) -> Result<Map<String, Value>, FirestoreError> {
    fields
        .into_iter()
        .map(|(key, value)| decode_value(value).map(|v| (key, v)))
        .collect()
}

/// Decode one Firestore typed value.
///
/// Timestamps, references and bytes come back as their string form; geo
/// points as `{latitude, longitude}`. Non-finite doubles become `null`.
pub fn decode_value(value: Value) -> Result<Value, FirestoreError> {
    let typed = match value {
        Value::Object(typed) => typed,
        other => return Err(decode_error(format!("expected a typed value, got {other}"))),
    };
    let Some((kind, inner)) = typed.into_iter().next() else {
        return Err(decode_error("empty typed value".to_string()));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => match inner {
            Value::Bool(_) => Ok(inner),
            other => Err(decode_error(format!("booleanValue is not a bool: {other}"))),
        },
        "integerValue" => decode_integer(&inner),
        "doubleValue" => Ok(decode_double(&inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => match inner {
            Value::String(_) => Ok(inner),
            other => Err(decode_error(format!("{kind} is not a string: {other}"))),
        },
        "geoPointValue" => {
            let latitude = inner.get("latitude").cloned().unwrap_or(json!(0.0));
            let longitude = inner.get("longitude").cloned().unwrap_or(json!(0.0));
            Ok(json!({ "latitude": latitude, "longitude": longitude }))
        }
        "arrayValue" => {
            let values = match inner {
                Value::Object(mut array) => array.remove("values"),
                _ => None,
            };
            match values {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                // An empty array is sent without `values`.
                None | Some(Value::Null) => Ok(Value::Array(Vec::new())),
                Some(other) => Err(decode_error(format!("arrayValue.values: {other}"))),
            }
        }
        "mapValue" => {
            let fields = match inner {
                Value::Object(mut map) => map.remove("fields"),
                _ => None,
            };
            match fields {
                Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
                None | Some(Value::Null) => Ok(Value::Object(Map::new())),
                Some(other) => Err(decode_error(format!("mapValue.fields: {other}"))),
            }
        }
        other => Err(decode_error(format!("unsupported value type {other}"))),
    }
}

fn decode_integer(inner: &Value) -> Result<Value, FirestoreError> {
    let parsed = match inner {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed
        .map(|i| Value::Number(i.into()))
        .ok_or_else(|| decode_error(format!("integerValue is not an integer: {inner}")))
}

fn decode_double(inner: &Value) -> Value {
    let parsed = match inner {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

const fn decode_error(message: String) -> FirestoreError {
    FirestoreError::Decode(message)
}
