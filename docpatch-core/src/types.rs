//! Document data model.
//!
//! A [`Document`] is a tree of key/value pairs whose keys are always held in
//! byte-lexicographic order. Every encoder walks that order, so two documents
//! built with different insertion orders are indistinguishable once encoded.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{TimeZone, Utc};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// 12-byte globally unique object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Lowercase 24-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 24-character hex string (either case).
    pub fn parse_str(s: &str) -> Result<Self, CoreError> {
        if s.len() != 24 {
            return Err(CoreError::InvalidObjectId(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| CoreError::InvalidObjectId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

// ---------------------------------------------------------------------------
// Scalar newtypes
// ---------------------------------------------------------------------------

/// Milliseconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtcDateTime(i64);

impl UtcDateTime {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn timestamp_millis(&self) -> i64 {
        self.0
    }

    pub fn from_chrono(dt: chrono::DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// `None` when the instant is outside chrono's representable range.
    pub fn to_chrono(&self) -> Option<chrono::DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

/// Internal replication timestamp: seconds plus an ordinal within the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// Binary blob with its subtype byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

/// Regular expression: pattern plus option letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl Regex {
    /// Options are kept sorted so equal expressions encode identically.
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        let mut opts: Vec<char> = options.into().chars().collect();
        opts.sort_unstable();
        Self {
            pattern: pattern.into(),
            options: opts.into_iter().collect(),
        }
    }
}

/// 128-bit decimal, held in its textual form.
///
/// Construction does not validate; [`Decimal128::is_well_formed`] is checked
/// by the strict encoders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal128(String);

impl Decimal128 {
    pub fn new(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `[+-]digits[.digits][(e|E)[+-]digits]`, or `Infinity`, `-Infinity`, `NaN`.
    pub fn is_well_formed(&self) -> bool {
        let s = self.0.as_str();
        if matches!(s, "Infinity" | "-Infinity" | "NaN") {
            return true;
        }
        let s = s.strip_prefix(['+', '-']).unwrap_or(s);
        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
            None => (s, None),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (mantissa, None),
        };
        let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
            return false;
        }
        if !digits(int_part) || !frac_part.map_or(true, digits) {
            return false;
        }
        match exponent {
            None => true,
            Some(e) => {
                let e = e.strip_prefix(['+', '-']).unwrap_or(e);
                !e.is_empty() && digits(e)
            }
        }
    }

    /// Approximate numeric value, used for ordering only.
    pub fn approx_f64(&self) -> Option<f64> {
        self.0.parse::<f64>().ok()
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single node of a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    String(String),
    Document(Document),
    Array(Vec<Value>),
    Binary(Binary),
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(UtcDateTime),
    Null,
    Regex(Regex),
    Int32(i32),
    Int64(i64),
    Timestamp(Timestamp),
    Decimal128(Decimal128),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
            Value::Binary(_) => "binary",
            Value::ObjectId(_) => "objectId",
            Value::Boolean(_) => "bool",
            Value::DateTime(_) => "date",
            Value::Null => "null",
            Value::Regex(_) => "regex",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Timestamp(_) => "timestamp",
            Value::Decimal128(_) => "decimal",
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view across int32, int64, double and decimal.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Decimal128(d) => d.approx_f64(),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Double(_) | Value::Int32(_) | Value::Int64(_) | Value::Decimal128(_)
        )
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Key/value tree. Keys iterate in byte-lexicographic order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Builder-style insert, handy for literals in tests and filters.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_hex_roundtrip() {
        let oid = ObjectId::parse_str("64B7F0C2A1B2C3D4E5F60718").expect("parse");
        assert_eq!(oid.to_hex(), "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(oid.to_string().parse::<ObjectId>().expect("reparse"), oid);
    }

    #[test]
    fn object_id_rejects_bad_length_and_digits() {
        assert!(ObjectId::parse_str("abc").is_err());
        assert!(ObjectId::parse_str("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn document_keys_iterate_sorted_regardless_of_insertion() {
        let a = Document::new().with("_id", "1").with("b", 2).with("a", 1);
        let b = Document::new().with("a", 1).with("b", 2).with("_id", "1");
        assert_eq!(a, b);
        let keys: Vec<_> = a.keys().cloned().collect();
        assert_eq!(keys, vec!["_id", "a", "b"]);
    }

    #[test]
    fn decimal_well_formedness() {
        for ok in ["1", "-1.5", "+0.25", ".5", "3.", "1E+10", "2e-3", "NaN", "-Infinity"] {
            assert!(Decimal128::new(ok).is_well_formed(), "{ok} should be accepted");
        }
        for bad in ["", ".", "1.2.3", "abc", "1e", "--1", "1e+"] {
            assert!(!Decimal128::new(bad).is_well_formed(), "{bad} should be rejected");
        }
    }

    #[test]
    fn regex_options_are_sorted() {
        assert_eq!(Regex::new("^a", "xmi").options, "imx");
    }

    #[test]
    fn numeric_view_spans_widths() {
        assert_eq!(Value::Int32(3).as_f64(), Some(3.0));
        assert_eq!(Value::Int64(3).as_f64(), Some(3.0));
        assert_eq!(Value::Decimal128(Decimal128::new("3.5")).as_f64(), Some(3.5));
        assert_eq!(Value::from("3").as_f64(), None);
    }

    #[test]
    fn datetime_chrono_bridge() {
        let dt = UtcDateTime::from_millis(1_700_000_000_123);
        let chrono_dt = dt.to_chrono().expect("in range");
        assert_eq!(UtcDateTime::from_chrono(chrono_dt), dt);
    }
}
