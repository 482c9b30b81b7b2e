//! docpatch core library — document model, identities, changes, configuration.
//!
//! - [`types`] — document tree and scalar types
//! - [`identity`] — [`IdentifierValue`], [`Identity`], [`Fingerprint`] and their text forms
//! - [`change`] — [`Change`] produced by reconciliation
//! - [`query`] — [`QueryParams`] captured with a snapshot
//! - [`config`] — [`EngineConfig`] and its loader
//! - [`error`] — [`CoreError`], [`ConfigError`]

pub mod change;
pub mod config;
pub mod error;
pub mod identity;
pub mod query;
pub mod types;

pub use change::{Change, ChangeCounts, ChangeKind};
pub use config::{DumpShape, EngineConfig, Mode};
pub use error::{ConfigError, CoreError};
pub use identity::{Fingerprint, IdentifierValue, Identity, FINGERPRINT_SEPARATOR};
pub use query::{Namespace, QueryParams, SortKey, SortOrder};
pub use types::{
    Binary, Decimal128, Document, ObjectId, Regex, Timestamp, UtcDateTime, Value,
};
