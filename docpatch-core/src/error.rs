//! Error types for docpatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the document model and identity text forms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid ObjectId '{0}': expected 24 hex characters")]
    InvalidObjectId(String),

    /// Only strings and ObjectIds can identify a document.
    #[error("identifier of type {found} is not supported; expected string or objectId")]
    UnsupportedIdentifierType { found: &'static str },

    #[error("invalid identifier value '{0}'")]
    InvalidIdentifierValue(String),

    #[error("malformed fingerprint record '{record}': {reason}")]
    MalformedFingerprint { record: String, reason: &'static str },
}

/// Errors from loading or validating [`crate::config::EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; includes file path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration parsed but violates an engine requirement.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
