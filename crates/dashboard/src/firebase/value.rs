//! Firestore typed-JSON value codec.
//!
//! Firestore's REST API wraps every value in a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Integers are
//! transmitted as decimal strings.

use bluefitt_core::{FieldValue, Fields};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Encode one value.
#[must_use]
pub fn encode(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(n) => json!({ "integerValue": n.to_string() }),
        FieldValue::Double(d) if d.is_finite() => json!({ "doubleValue": d }),
        FieldValue::Double(d) => {
            let special = if d.is_nan() {
                "NaN"
            } else if d.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            };
            json!({ "doubleValue": special })
        }
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
        FieldValue::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Encode a field map into a Firestore `fields` object.
#[must_use]
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), encode(value)))
            .collect(),
    )
}

/// Decode one value. Unknown or malformed encodings decode to `Null`.
#[must_use]
pub fn decode(value: &Value) -> FieldValue {
    let Some(object) = value.as_object() else {
        return FieldValue::Null;
    };
    let Some((kind, inner)) = object.iter().next() else {
        return FieldValue::Null;
    };

    match kind.as_str() {
        "booleanValue" => inner.as_bool().map_or(FieldValue::Null, FieldValue::Bool),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| inner.as_i64())
            .map_or(FieldValue::Null, FieldValue::Integer),
        "doubleValue" => decode_double(inner),
        "stringValue" | "referenceValue" => inner
            .as_str()
            .map_or(FieldValue::Null, |s| FieldValue::String(s.to_owned())),
        "timestampValue" => inner
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or(FieldValue::Null, |ts| FieldValue::Timestamp(ts.with_timezone(&Utc))),
        "arrayValue" => FieldValue::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => FieldValue::Map(decode_fields(inner.get("fields").and_then(Value::as_object))),
        _ => FieldValue::Null,
    }
}

/// Decode a Firestore `fields` object. A missing object is an empty map.
#[must_use]
pub fn decode_fields(fields: Option<&Map<String, Value>>) -> Fields {
    fields
        .map(|fields| {
            fields
                .iter()
                .map(|(name, value)| (name.clone(), decode(value)))
                .collect()
        })
        .unwrap_or_default()
}

fn decode_double(inner: &Value) -> FieldValue {
    match inner {
        Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Double),
        Value::String(s) => match s.as_str() {
            "NaN" => FieldValue::Double(f64::NAN),
            "Infinity" => FieldValue::Double(f64::INFINITY),
            "-Infinity" => FieldValue::Double(f64::NEG_INFINITY),
            other => other.parse().map_or(FieldValue::Null, FieldValue::Double),
        },
        _ => FieldValue::Null,
    }
}
