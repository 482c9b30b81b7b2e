//! # docpatch-sync
//!
//! Snapshot, reconcile and restore.
//!
//! [`Engine::query`] captures documents from a [`DocumentStore`] into a
//! snapshot and an editable dump; [`Engine::review`] and [`Engine::apply`]
//! reconcile the edited dump against the snapshot and realise the changes.

pub mod apply;
pub mod differ;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod local_store;
pub mod restore;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod writer;

pub use apply::{apply_changes, Aborted, ApplyOutcome, ApplyReport};
pub use differ::diff;
pub use engine::{Engine, QueryOutcome, Reconciliation, Review, Status};
pub use error::{DiffError, HashError, RestoreError, StoreError, SyncError};
pub use hasher::{checksum, Hasher};
pub use local_store::LocalStore;
pub use restore::{Built, CommandEmission, DirectApply, RestoreStrategy, WriteOp};
pub use session::{Session, SessionManager, SessionState, StoredQuery};
pub use snapshot::Snapshot;
pub use store::{DocumentStore, MemoryStore, UpdateOutcome};
pub use writer::{atomic_write, WriteResult};
