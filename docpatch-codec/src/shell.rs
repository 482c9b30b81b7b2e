//! Shell renderer — console constructor syntax, suitable for pasting.
//!
//! ```text
//! {"_id": ObjectId("64b7f0c2a1b2c3d4e5f60718"), "at": ISODate("2024-01-01T00:00:00.000Z"), "n": NumberLong("5")}
//! ```
//!
//! Rendering never fails. Values the strict encoders reject (malformed
//! decimals, NUL bytes, excessive nesting) degrade to plain string literals.

use base64::{engine::general_purpose::STANDARD, Engine};

use docpatch_core::{Document, Value};

use crate::encode::{format_double, format_iso_date, MAX_DEPTH};

/// Render a document. `compact` puts everything on one line.
pub fn render_document(doc: &Document, compact: bool, indent: &str) -> String {
    let mut out = String::new();
    let mut renderer = ShellRenderer {
        out: &mut out,
        compact,
        indent,
    };
    renderer.document(doc, 0);
    out
}

/// Render a single value in shell syntax.
pub fn render_value(value: &Value, compact: bool, indent: &str) -> String {
    let mut out = String::new();
    let mut renderer = ShellRenderer {
        out: &mut out,
        compact,
        indent,
    };
    renderer.value(value, 0);
    out
}

struct ShellRenderer<'a> {
    out: &'a mut String,
    compact: bool,
    indent: &'a str,
}

impl ShellRenderer<'_> {
    fn document(&mut self, doc: &Document, depth: usize) {
        if depth >= MAX_DEPTH {
            self.out.push_str(&quote("[nested too deep]"));
            return;
        }
        if doc.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push('{');
        for (i, (key, value)) in doc.iter().enumerate() {
            self.separator(i, depth + 1);
            self.out.push_str(&quote(key));
            self.out.push_str(": ");
            self.value(value, depth + 1);
        }
        self.close('}', depth);
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if depth >= MAX_DEPTH {
            self.out.push_str(&quote("[nested too deep]"));
            return;
        }
        if items.is_empty() {
            self.out.push_str("[]");
            return;
        }
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            self.separator(i, depth + 1);
            self.value(item, depth + 1);
        }
        self.close(']', depth);
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Document(doc) => self.document(doc, depth),
            Value::Array(items) => self.array(items, depth),
            scalar => {
                let text = scalar_text(scalar);
                self.out.push_str(&text);
            }
        }
    }

    /// Comma (after the first item) plus newline/indent or a space.
    fn separator(&mut self, index: usize, depth: usize) {
        if index > 0 {
            self.out.push(',');
        }
        if self.compact {
            if index > 0 {
                self.out.push(' ');
            }
        } else {
            self.newline(depth);
        }
    }

    fn close(&mut self, bracket: char, depth: usize) {
        if !self.compact {
            self.newline(depth);
        }
        self.out.push(bracket);
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(self.indent);
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::String(s) => quote(s),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => format!("NumberLong(\"{v}\")"),
        // Integral literals are stored as int32 by the console.
        Value::Double(v) if v.is_finite() && v.fract() == 0.0 => {
            format!("Double({})", format_double(*v))
        }
        Value::Double(v) => format_double(*v),
        Value::Decimal128(d) if d.is_well_formed() => format!("NumberDecimal(\"{d}\")"),
        Value::Decimal128(d) => quote(d.as_str()),
        Value::ObjectId(oid) => format!("ObjectId(\"{oid}\")"),
        Value::DateTime(dt) => match format_iso_date(*dt) {
            Some(iso) => format!("ISODate(\"{iso}\")"),
            None => format!("new Date({})", dt.timestamp_millis()),
        },
        Value::Binary(bin) => format!(
            "BinData({}, \"{}\")",
            bin.subtype,
            STANDARD.encode(&bin.bytes)
        ),
        Value::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
        Value::Regex(re) => regex_text(&re.pattern, &re.options),
        Value::Document(_) | Value::Array(_) => quote(value.type_name()),
    }
}

/// `/pattern/options` when the literal form is unambiguous, `RegExp(…)` otherwise.
fn regex_text(pattern: &str, options: &str) -> String {
    let literal_safe = !pattern.is_empty()
        && !pattern.contains(['/', '\n', '\r', '\0'])
        && options.chars().all(|c| c.is_ascii_alphabetic());
    if literal_safe {
        format!("/{pattern}/{options}")
    } else {
        format!("RegExp({}, {})", quote(pattern), quote(options))
    }
}

/// JSON string literal.
fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_core::{Binary, Decimal128, ObjectId, Regex, Timestamp, UtcDateTime};

    fn sample() -> Document {
        Document::new()
            .with("_id", ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").expect("oid"))
            .with("n", 5i64)
            .with("at", Value::DateTime(UtcDateTime::from_millis(1_704_067_200_000)))
    }

    #[test]
    fn compact_uses_constructors() {
        let out = render_document(&sample(), true, "  ");
        assert_eq!(
            out,
            r#"{"_id": ObjectId("64b7f0c2a1b2c3d4e5f60718"), "at": ISODate("2024-01-01T00:00:00.000Z"), "n": NumberLong("5")}"#
        );
    }

    #[test]
    fn indented_layout() {
        let doc = Document::new()
            .with("a", vec![Value::Int32(1), Value::Double(2.0)])
            .with("e", Document::new());
        let out = render_document(&doc, false, "  ");
        assert_eq!(out, "{\n  \"a\": [\n    1,\n    Double(2.0)\n  ],\n  \"e\": {}\n}");
    }

    #[test]
    fn integral_doubles_keep_their_type() {
        assert_eq!(render_value(&Value::Double(2.0), true, ""), "Double(2.0)");
        assert_eq!(render_value(&Value::Double(-0.0), true, ""), "Double(-0.0)");
        assert_eq!(render_value(&Value::Double(2.5), true, ""), "2.5");
        assert_eq!(render_value(&Value::Double(f64::INFINITY), true, ""), "Infinity");
        assert_eq!(render_value(&Value::Int32(2), true, ""), "2");
    }

    #[test]
    fn remaining_scalars() {
        assert_eq!(
            render_value(&Value::Binary(Binary { subtype: 0, bytes: vec![0xff] }), true, ""),
            "BinData(0, \"/w==\")"
        );
        assert_eq!(
            render_value(&Value::Timestamp(Timestamp { time: 3, increment: 9 }), true, ""),
            "Timestamp(3, 9)"
        );
        assert_eq!(render_value(&Value::Regex(Regex::new("^a.*", "mi")), true, ""), "/^a.*/im");
        assert_eq!(
            render_value(&Value::Regex(Regex::new("a/b", "")), true, ""),
            "RegExp(\"a/b\", \"\")"
        );
        assert_eq!(
            render_value(&Value::Decimal128(Decimal128::new("9.99")), true, ""),
            "NumberDecimal(\"9.99\")"
        );
    }

    #[test]
    fn unencodable_values_degrade_to_strings() {
        let doc = Document::new()
            .with("d", Value::Decimal128(Decimal128::new("lots")))
            .with("k\0", 1);
        let out = render_document(&doc, true, "");
        assert_eq!(out, r#"{"d": "lots", "k\u0000": 1}"#);
    }

    #[test]
    fn deep_nesting_is_truncated_not_fatal() {
        let mut doc = Document::new().with("leaf", 1);
        for _ in 0..(MAX_DEPTH + 5) {
            doc = Document::new().with("n", doc);
        }
        let out = render_document(&doc, true, "");
        assert!(out.contains("[nested too deep]"));
        assert!(!out.contains("leaf"));
    }
}
