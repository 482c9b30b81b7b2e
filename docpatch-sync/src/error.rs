//! Error types for docpatch-sync.

use std::path::PathBuf;

use thiserror::Error;

use docpatch_codec::{DecodeError, EncodeError};
use docpatch_core::{ChangeKind, ConfigError, CoreError};

/// Failure to fingerprint a single document.
#[derive(Debug, Error)]
pub enum HashError {
    /// None of the configured identifier fields is present.
    #[error("document has none of the identifier fields [{}]", candidates.join(", "))]
    NoIdentifier { candidates: Vec<String> },

    #[error("identifier field '{field}': {source}")]
    Identifier {
        field: String,
        #[source]
        source: CoreError,
    },

    #[error("canonical encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Failure of a reconciliation pass. Always fatal to the whole pass.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("edited document #{index}: {source}")]
    Document {
        index: usize,
        #[source]
        source: HashError,
    },

    #[error("edited document #{index} repeats identifier {identifier}")]
    DuplicateIdentifier { index: usize, identifier: String },
}

/// Errors raised by a document store. Any of these aborts an apply batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store '{target}' is unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt collection file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("cannot encode document for storage: {0}")]
    Encode(#[from] EncodeError),

    #[error("duplicate key {key}")]
    DuplicateKey { key: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Failure to build or execute one restore action.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// An update or delete matched nothing.
    #[error("{kind} target {identity} matched no document")]
    TargetVanished { identity: String, kind: ChangeKind },

    #[error("cannot insert {identity}: a document with that key already exists")]
    AlreadyExists { identity: String },

    #[error("cannot render payload for {identity}: {source}")]
    Encode {
        identity: String,
        #[source]
        source: EncodeError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// All errors that can arise from engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("session record {path} is unreadable: {source}")]
    SessionParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("session record YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("snapshot {path} line {line}: {source}")]
    Snapshot {
        path: PathBuf,
        line: usize,
        #[source]
        source: CoreError,
    },

    #[error("query result #{index}: {source}")]
    Hash {
        index: usize,
        #[source]
        source: HashError,
    },

    #[error("query returned identifier {identifier} more than once")]
    DuplicateIdentifier { identifier: String },

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("cannot read dump {path}: {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("stored query is unreadable: {0}")]
    StoredQuery(#[source] DecodeError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// No session record exists in the staging directory.
    #[error("no active session in {staging_dir}; run a query first")]
    NoSession { staging_dir: PathBuf },

    /// The session record exists but its artifacts do not.
    #[error("session artifacts are missing ({}); recover the session or clear it", preview(.missing))]
    SessionLost { missing: Vec<PathBuf> },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn store_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

fn preview(paths: &[PathBuf]) -> String {
    let mut shown: Vec<String> = paths
        .iter()
        .take(3)
        .map(|p| p.display().to_string())
        .collect();
    if paths.len() > shown.len() {
        shown.push(format!("+{} more", paths.len() - shown.len()));
    }
    shown.join(", ")
}
