//! Error types for docpatch-codec.

use thiserror::Error;

/// Errors from the canonical and relaxed encoders.
///
/// The shell renderer never produces these; it degrades instead.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Only a single document may be encoded at the top level.
    #[error("top-level value must be a document, got {found}")]
    TopLevelNotDocument { found: &'static str },

    #[error("key {key:?} contains a NUL byte")]
    InvalidKey { key: String },

    #[error("regular expression {pattern:?} contains a NUL byte")]
    InvalidRegex { pattern: String },

    #[error("'{literal}' is not a valid decimal128 literal")]
    InvalidDecimal { literal: String },

    #[error("document nesting exceeds {max} levels")]
    MaxDepthExceeded { max: usize },

    /// Dumps must be readable again, which shell syntax is not.
    #[error("dump mode '{mode}' cannot be read back; use canonical or relaxed")]
    UnreadableDumpMode { mode: docpatch_core::Mode },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the extended-JSON decoder and dump reader.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a document, got {found}")]
    NotADocument { found: &'static str },

    #[error("expected a JSON array of documents, got {found}")]
    NotAnArray { found: &'static str },

    #[error("malformed {key} value: {reason}")]
    InvalidWrapper { key: &'static str, reason: String },

    /// Failure inside one document of a dump, with its zero-based position.
    #[error("document #{index}: {source}")]
    Document {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn wrapper(key: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidWrapper {
            key,
            reason: reason.into(),
        }
    }

    pub(crate) fn at(index: usize, source: DecodeError) -> Self {
        DecodeError::Document {
            index,
            source: Box::new(source),
        }
    }
}
