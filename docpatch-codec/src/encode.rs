//! Canonical and relaxed extended-JSON encoders, plus the [`encode`] entry
//! point that also dispatches to the shell renderer.
//!
//! # Wire forms
//!
//! | type       | canonical                                   | relaxed                          |
//! |------------|---------------------------------------------|----------------------------------|
//! | int32      | `{"$numberInt":"1"}`                        | `1`                              |
//! | int64      | `{"$numberLong":"1"}`                       | `5000000000`, tagged in int32 range |
//! | double     | `{"$numberDouble":"1.0"}`                   | `1.0` (finite only)              |
//! | decimal128 | `{"$numberDecimal":"1.5"}`                  | same                             |
//! | datetime   | `{"$date":{"$numberLong":"0"}}`             | `{"$date":"1970-01-01T00:00:00.000Z"}` |
//! | objectId   | `{"$oid":"…"}`                              | same                             |
//! | binary     | `{"$binary":{"base64":"…","subType":"00"}}` | same                             |
//! | timestamp  | `{"$timestamp":{"i":1,"t":2}}`              | same                             |
//! | regex      | `{"$regularExpression":{"options":"i","pattern":"…"}}` | same                  |
//!
//! Object keys are always emitted in sorted order, wrappers included, so the
//! output does not depend on how `serde_json::Map` is backed.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::{json, Map, Number};

use docpatch_core::{Binary, Document, Mode, Regex, UtcDateTime, Value};

use crate::error::EncodeError;
use crate::shell;

/// Maximum container nesting accepted by the strict encoders.
pub const MAX_DEPTH: usize = 100;

/// Largest instant rendered as an ISO string in relaxed mode (9999-12-31T23:59:59.999Z).
const MAX_RELAXED_DATE_MILLIS: i64 = 253_402_300_799_999;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub mode: Mode,
    /// One line when `true`, indented otherwise.
    pub compact: bool,
    /// Indent unit used when not compact.
    pub indent: String,
}

impl EncodeOptions {
    pub fn new(mode: Mode, compact: bool) -> Self {
        Self {
            mode,
            compact,
            indent: "  ".to_string(),
        }
    }

    /// The encoding checksums are computed over.
    pub fn canonical_compact() -> Self {
        Self::new(Mode::Canonical, true)
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new(Mode::Canonical, false)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Encode a top-level value, which must be a document.
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<String, EncodeError> {
    match value {
        Value::Document(doc) => encode_document(doc, options),
        other => Err(EncodeError::TopLevelNotDocument {
            found: other.type_name(),
        }),
    }
}

/// Encode a document under `options`.
pub fn encode_document(doc: &Document, options: &EncodeOptions) -> Result<String, EncodeError> {
    if options.mode == Mode::Shell {
        return Ok(shell::render_document(doc, options.compact, &options.indent));
    }
    let json = document_to_json(doc, options.mode, 0)?;
    write_json(&json, options)
}

/// Convert a document to its extended-JSON tree. `mode` must not be shell.
pub fn to_extended_json(doc: &Document, mode: Mode) -> Result<serde_json::Value, EncodeError> {
    let mode = if mode == Mode::Shell { Mode::Relaxed } else { mode };
    document_to_json(doc, mode, 0)
}

pub(crate) fn write_json(
    json: &serde_json::Value,
    options: &EncodeOptions,
) -> Result<String, EncodeError> {
    if options.compact {
        return Ok(serde_json::to_string(json)?);
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(options.indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    json.serialize(&mut ser)?;
    // serde_json only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ---------------------------------------------------------------------------
// Tree conversion
// ---------------------------------------------------------------------------

fn document_to_json(
    doc: &Document,
    mode: Mode,
    depth: usize,
) -> Result<serde_json::Value, EncodeError> {
    if depth >= MAX_DEPTH {
        return Err(EncodeError::MaxDepthExceeded { max: MAX_DEPTH });
    }
    let mut map = Map::new();
    for (key, value) in doc {
        if key.contains('\0') {
            return Err(EncodeError::InvalidKey { key: key.clone() });
        }
        map.insert(key.clone(), value_to_json(value, mode, depth + 1)?);
    }
    Ok(serde_json::Value::Object(map))
}

fn value_to_json(value: &Value, mode: Mode, depth: usize) -> Result<serde_json::Value, EncodeError> {
    let relaxed = mode == Mode::Relaxed;
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int32(v) if relaxed => json!(v),
        Value::Int32(v) => json!({ "$numberInt": v.to_string() }),
        // A bare number inside int32 range decodes as int32.
        Value::Int64(v) if relaxed && i32::try_from(*v).is_err() => json!(v),
        Value::Int64(v) => json!({ "$numberLong": v.to_string() }),
        Value::Double(v) => match Number::from_f64(*v) {
            Some(n) if relaxed => serde_json::Value::Number(n),
            _ => json!({ "$numberDouble": format_double(*v) }),
        },
        Value::Decimal128(d) => {
            if !d.is_well_formed() {
                return Err(EncodeError::InvalidDecimal {
                    literal: d.as_str().to_string(),
                });
            }
            json!({ "$numberDecimal": d.as_str() })
        }
        Value::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
        Value::DateTime(dt) => date_to_json(*dt, relaxed),
        Value::Binary(bin) => binary_to_json(bin),
        Value::Timestamp(ts) => json!({ "$timestamp": { "i": ts.increment, "t": ts.time } }),
        Value::Regex(re) => regex_to_json(re)?,
        Value::Document(doc) => document_to_json(doc, mode, depth)?,
        Value::Array(items) => {
            if depth >= MAX_DEPTH {
                return Err(EncodeError::MaxDepthExceeded { max: MAX_DEPTH });
            }
            let items = items
                .iter()
                .map(|item| value_to_json(item, mode, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::Value::Array(items)
        }
    };
    Ok(json)
}

fn date_to_json(dt: UtcDateTime, relaxed: bool) -> serde_json::Value {
    let millis = dt.timestamp_millis();
    if relaxed && (0..=MAX_RELAXED_DATE_MILLIS).contains(&millis) {
        if let Some(iso) = format_iso_date(dt) {
            return json!({ "$date": iso });
        }
    }
    json!({ "$date": { "$numberLong": millis.to_string() } })
}

fn binary_to_json(bin: &Binary) -> serde_json::Value {
    json!({
        "$binary": {
            "base64": STANDARD.encode(&bin.bytes),
            "subType": format!("{:02x}", bin.subtype),
        }
    })
}

fn regex_to_json(re: &Regex) -> Result<serde_json::Value, EncodeError> {
    if re.pattern.contains('\0') || re.options.contains('\0') {
        return Err(EncodeError::InvalidRegex {
            pattern: re.pattern.clone(),
        });
    }
    Ok(json!({
        "$regularExpression": { "options": re.options, "pattern": re.pattern }
    }))
}

// ---------------------------------------------------------------------------
// Scalar formatting shared with the shell renderer
// ---------------------------------------------------------------------------

/// Round-trippable text for a double: `1.0`, `0.1`, `1e100`, `-0.0`,
/// `Infinity`, `-Infinity`, `NaN`.
pub(crate) fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let text = if v > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else {
        format!("{v:?}")
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, or `None` when chrono cannot represent it.
pub(crate) fn format_iso_date(dt: UtcDateTime) -> Option<String> {
    dt.to_chrono()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
