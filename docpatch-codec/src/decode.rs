//! Extended-JSON decoder accepting both canonical and relaxed forms.
//!
//! An object is read as a type wrapper only when it has exactly one key and
//! that key is a known wrapper (`$oid`, `$date`, …); anything else is an
//! ordinary document, even if its keys start with `$`.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::DateTime;
use serde_json::Map;

use docpatch_core::{
    Binary, Decimal128, Document, ObjectId, Regex, Timestamp, UtcDateTime, Value,
};

use crate::error::DecodeError;

/// Parse one document from extended-JSON text.
pub fn from_json_str(text: &str) -> Result<Document, DecodeError> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    document_from_json(&json)
}

/// Convert a parsed JSON value that must be an object.
pub fn document_from_json(json: &serde_json::Value) -> Result<Document, DecodeError> {
    match value_from_json(json)? {
        Value::Document(doc) => Ok(doc),
        other => Err(DecodeError::NotADocument {
            found: other.type_name(),
        }),
    }
}

/// Convert any parsed JSON value.
pub fn value_from_json(json: &serde_json::Value) -> Result<Value, DecodeError> {
    let value = match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Number(n) => number_from_json(n),
        serde_json::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(value_from_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(map) => object_from_json(map)?,
    };
    Ok(value)
}

/// Native integers narrow to int32 when they fit; everything else is a double.
fn number_from_json(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return match i32::try_from(i) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(i),
        };
    }
    Value::Double(n.as_f64().unwrap_or(f64::NAN))
}

fn object_from_json(map: &Map<String, serde_json::Value>) -> Result<Value, DecodeError> {
    if map.len() == 1 {
        if let Some((key, inner)) = map.iter().next() {
            if let Some(value) = wrapper_from_json(key, inner)? {
                return Ok(value);
            }
        }
    }
    let doc = map
        .iter()
        .map(|(k, v)| Ok((k.clone(), value_from_json(v)?)))
        .collect::<Result<Document, DecodeError>>()?;
    Ok(Value::Document(doc))
}

/// `Ok(None)` when `key` is not a wrapper key.
fn wrapper_from_json(key: &str, inner: &serde_json::Value) -> Result<Option<Value>, DecodeError> {
    let value = match key {
        "$oid" => {
            let hex = expect_str("$oid", inner)?;
            let oid = ObjectId::parse_str(hex)
                .map_err(|e| DecodeError::wrapper("$oid", e.to_string()))?;
            Value::ObjectId(oid)
        }
        "$numberInt" => {
            let text = expect_str("$numberInt", inner)?;
            let v = text
                .parse::<i32>()
                .map_err(|e| DecodeError::wrapper("$numberInt", e.to_string()))?;
            Value::Int32(v)
        }
        "$numberLong" => Value::Int64(parse_long("$numberLong", inner)?),
        "$numberDouble" => {
            let text = expect_str("$numberDouble", inner)?;
            Value::Double(parse_double(text)?)
        }
        "$numberDecimal" => {
            let decimal = Decimal128::new(expect_str("$numberDecimal", inner)?);
            if !decimal.is_well_formed() {
                return Err(DecodeError::wrapper(
                    "$numberDecimal",
                    format!("'{decimal}' is not a decimal literal"),
                ));
            }
            Value::Decimal128(decimal)
        }
        "$date" => Value::DateTime(parse_date(inner)?),
        "$binary" => {
            let fields = expect_object("$binary", inner)?;
            let b64 = field_str("$binary", fields, "base64")?;
            let subtype = field_str("$binary", fields, "subType")?;
            let bytes = STANDARD
                .decode(b64)
                .map_err(|e| DecodeError::wrapper("$binary", e.to_string()))?;
            let subtype = u8::from_str_radix(subtype, 16)
                .map_err(|e| DecodeError::wrapper("$binary", format!("subType: {e}")))?;
            Value::Binary(Binary { subtype, bytes })
        }
        "$timestamp" => {
            let fields = expect_object("$timestamp", inner)?;
            Value::Timestamp(Timestamp {
                time: field_u32("$timestamp", fields, "t")?,
                increment: field_u32("$timestamp", fields, "i")?,
            })
        }
        "$regularExpression" => {
            let fields = expect_object("$regularExpression", inner)?;
            Value::Regex(Regex::new(
                field_str("$regularExpression", fields, "pattern")?,
                field_str("$regularExpression", fields, "options")?,
            ))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn parse_date(inner: &serde_json::Value) -> Result<UtcDateTime, DecodeError> {
    match inner {
        serde_json::Value::String(iso) => DateTime::parse_from_rfc3339(iso)
            .map(|dt| UtcDateTime::from_millis(dt.timestamp_millis()))
            .map_err(|e| DecodeError::wrapper("$date", format!("'{iso}': {e}"))),
        serde_json::Value::Object(map) => match map.get("$numberLong") {
            Some(long) if map.len() == 1 => {
                Ok(UtcDateTime::from_millis(parse_long("$date", long)?))
            }
            _ => Err(DecodeError::wrapper("$date", "expected {\"$numberLong\": …}")),
        },
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(UtcDateTime::from_millis)
            .ok_or_else(|| DecodeError::wrapper("$date", "milliseconds must be an integer")),
        other => Err(DecodeError::wrapper(
            "$date",
            format!("unexpected {}", json_type(other)),
        )),
    }
}

fn parse_long(key: &'static str, inner: &serde_json::Value) -> Result<i64, DecodeError> {
    expect_str(key, inner)?
        .parse::<i64>()
        .map_err(|e| DecodeError::wrapper(key, e.to_string()))
}

fn parse_double(text: &str) -> Result<f64, DecodeError> {
    match text {
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => text
            .parse::<f64>()
            .map_err(|e| DecodeError::wrapper("$numberDouble", format!("'{text}': {e}"))),
    }
}

fn expect_str<'a>(key: &'static str, v: &'a serde_json::Value) -> Result<&'a str, DecodeError> {
    v.as_str()
        .ok_or_else(|| DecodeError::wrapper(key, format!("expected string, got {}", json_type(v))))
}

fn expect_object<'a>(
    key: &'static str,
    v: &'a serde_json::Value,
) -> Result<&'a Map<String, serde_json::Value>, DecodeError> {
    v.as_object()
        .ok_or_else(|| DecodeError::wrapper(key, format!("expected object, got {}", json_type(v))))
}

fn field_str<'a>(
    key: &'static str,
    fields: &'a Map<String, serde_json::Value>,
    name: &str,
) -> Result<&'a str, DecodeError> {
    fields
        .get(name)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| DecodeError::wrapper(key, format!("missing string field '{name}'")))
}

fn field_u32(
    key: &'static str,
    fields: &Map<String, serde_json::Value>,
    name: &str,
) -> Result<u32, DecodeError> {
    fields
        .get(name)
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| DecodeError::wrapper(key, format!("field '{name}' must be a u32")))
}

pub(crate) fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
