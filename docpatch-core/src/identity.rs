//! Document identity and fingerprints.
//!
//! # Text forms
//!
//! ```text
//! identifier value   "abc"                      (JSON string literal)
//!                    ObjectId("64b7f0c2a1b2c3d4e5f60718")
//! identifier         _id "abc"
//! fingerprint        _id "abc" 9f86d081884c7d65...
//! ```
//!
//! These forms are persisted in snapshot files and must stay byte-stable.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{Document, ObjectId, Value};

/// Separator between the parts of an identifier and of a fingerprint record.
pub const FINGERPRINT_SEPARATOR: char = ' ';

const OBJECT_ID_PREFIX: &str = "ObjectId(\"";
const OBJECT_ID_SUFFIX: &str = "\")";

// ---------------------------------------------------------------------------
// IdentifierValue
// ---------------------------------------------------------------------------

/// The value of a document's identity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierValue {
    String(String),
    ObjectId(ObjectId),
}

impl IdentifierValue {
    /// Wrap a document value; only strings and ObjectIds identify documents.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::ObjectId(oid) => Ok(Self::ObjectId(*oid)),
            other => Err(CoreError::UnsupportedIdentifierType {
                found: other.type_name(),
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::ObjectId(oid) => Value::ObjectId(*oid),
        }
    }
}

impl fmt::Display for IdentifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
            Self::ObjectId(oid) => write!(f, "{OBJECT_ID_PREFIX}{oid}{OBJECT_ID_SUFFIX}"),
        }
    }
}

impl FromStr for IdentifierValue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex) = s
            .strip_prefix(OBJECT_ID_PREFIX)
            .and_then(|rest| rest.strip_suffix(OBJECT_ID_SUFFIX))
        {
            return ObjectId::parse_str(hex).map(Self::ObjectId);
        }
        if s.starts_with('"') {
            return serde_json::from_str::<String>(s)
                .map(Self::String)
                .map_err(|_| CoreError::InvalidIdentifierValue(s.to_string()));
        }
        Err(CoreError::InvalidIdentifierValue(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Which field identifies a document, and its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub identified_by: String,
    pub value: IdentifierValue,
}

impl Identity {
    pub fn new(identified_by: impl Into<String>, value: IdentifierValue) -> Self {
        Self {
            identified_by: identified_by.into(),
            value,
        }
    }

    /// `{identified_by: value}` — the filter that targets exactly this document.
    pub fn filter(&self) -> Document {
        Document::new().with(self.identified_by.clone(), self.value.to_value())
    }
}

/// Renders the identifier string used as snapshot key.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FINGERPRINT_SEPARATOR}{}", self.identified_by, self.value)
    }
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Identity plus content checksum, capturing a document's exact state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub identity: Identity,
    /// Lowercase hex SHA-256 of the canonical encoding.
    pub checksum: String,
}

impl Fingerprint {
    pub fn new(identity: Identity, checksum: impl Into<String>) -> Self {
        Self {
            identity,
            checksum: checksum.into(),
        }
    }

    /// Snapshot key: `identified_by SEP identifier_value`.
    pub fn identifier(&self) -> String {
        self.identity.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FINGERPRINT_SEPARATOR}{}", self.identity, self.checksum)
    }
}

/// Splits on the first and the last separator; the identifier value in the
/// middle may itself contain separators.
impl FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| CoreError::MalformedFingerprint {
            record: s.to_string(),
            reason,
        };

        let (identified_by, rest) = s
            .split_once(FINGERPRINT_SEPARATOR)
            .ok_or_else(|| malformed("missing separator"))?;
        let (value, checksum) = rest
            .rsplit_once(FINGERPRINT_SEPARATOR)
            .ok_or_else(|| malformed("missing checksum"))?;

        if identified_by.is_empty() {
            return Err(malformed("empty identity field"));
        }
        if checksum.is_empty() || !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed("checksum is not hex"));
        }

        Ok(Self {
            identity: Identity::new(identified_by, value.parse()?),
            checksum: checksum.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
