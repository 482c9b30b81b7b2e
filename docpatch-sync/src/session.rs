//! Session manager — tracks the one open query in a staging directory.
//!
//! ```text
//! <staging_dir>/
//!   session.yaml          query parameters and artifact names
//!   snapshot.fp           fingerprints captured by the query
//!   dump.json | .jsonl    the editable documents
//! ```
//!
//! State is derived lazily on every read:
//!
//! 1. `Absent` — no `session.yaml`
//! 2. `Lost` — `session.yaml` exists but an artifact is missing or unreadable
//! 3. `Active`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docpatch_codec::{encode_document, from_json_str, EncodeError, EncodeOptions};
use docpatch_core::{DumpShape, Mode, QueryParams, SortKey};

use crate::error::{io_err, SyncError};
use crate::writer::atomic_write;

pub const SESSION_FILE: &str = "session.yaml";
pub const SNAPSHOT_FILE: &str = "snapshot.fp";

/// `dump.json` or `dump.jsonl`.
pub fn dump_file_name(shape: DumpShape) -> String {
    format!("dump.{}", shape.extension())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// [`QueryParams`] in persisted form. Documents are kept as canonical JSON
/// text so no type information is lost in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuery {
    pub target: String,
    pub database: String,
    pub collection: String,
    pub filter: String,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub sort: Vec<String>,
    pub projection: String,
}

impl StoredQuery {
    pub fn from_params(params: &QueryParams) -> Result<Self, EncodeError> {
        let options = EncodeOptions::canonical_compact();
        Ok(Self {
            target: params.target.clone(),
            database: params.database.clone(),
            collection: params.collection.clone(),
            filter: encode_document(&params.filter, &options)?,
            limit: params.limit,
            sort: params.sort.iter().map(SortKey::to_string).collect(),
            projection: encode_document(&params.projection, &options)?,
        })
    }

    pub fn to_params(&self) -> Result<QueryParams, SyncError> {
        Ok(QueryParams {
            target: self.target.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            filter: from_json_str(&self.filter).map_err(SyncError::StoredQuery)?,
            limit: self.limit,
            sort: self
                .sort
                .iter()
                .flat_map(|key| SortKey::parse_list(key))
                .collect(),
            projection: from_json_str(&self.projection).map_err(SyncError::StoredQuery)?,
        })
    }
}

/// The persisted session descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub query: StoredQuery,
    pub created_at: DateTime<Utc>,
    pub snapshot_file: String,
    pub dump_file: String,
    pub dump_mode: Mode,
    pub dump_shape: DumpShape,
    /// Documents in the snapshot and dump.
    pub documents: usize,
    /// Query results left out because they could not be encoded.
    #[serde(default)]
    pub skipped: usize,
    /// SHA-256 of the dump as written, to tell whether it was edited.
    pub dump_checksum: String,
}

/// Lifecycle state of the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Active(Session),
    Lost {
        session: Session,
        missing: Vec<PathBuf>,
    },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Absent => "absent",
            SessionState::Active(_) => "active",
            SessionState::Lost { .. } => "lost",
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Absent => None,
            SessionState::Active(session) | SessionState::Lost { session, .. } => Some(session),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Reads and writes session state under one staging directory.
#[derive(Debug, Clone)]
pub struct SessionManager {
    staging_dir: PathBuf,
}

impl SessionManager {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn session_path(&self) -> PathBuf {
        self.staging_dir.join(SESSION_FILE)
    }

    pub fn snapshot_path(&self, session: &Session) -> PathBuf {
        self.staging_dir.join(&session.snapshot_file)
    }

    pub fn dump_path(&self, session: &Session) -> PathBuf {
        self.staging_dir.join(&session.dump_file)
    }

    /// The session record, if one exists.
    pub fn load(&self) -> Result<Option<Session>, SyncError> {
        let path = self.session_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };
        let session = serde_yaml::from_str(&contents)
            .map_err(|source| SyncError::SessionParse { path, source })?;
        Ok(Some(session))
    }

    /// Persist `session` atomically.
    pub fn save(&self, session: &Session) -> Result<(), SyncError> {
        let path = self.session_path();
        let yaml = serde_yaml::to_string(session)?;
        atomic_write(&path, &yaml).map_err(|e| io_err(&path, e))?;
        tracing::debug!("session saved: {}", path.display());
        Ok(())
    }

    pub fn state(&self) -> Result<SessionState, SyncError> {
        let Some(session) = self.load()? else {
            return Ok(SessionState::Absent);
        };

        let missing: Vec<PathBuf> = [self.snapshot_path(&session), self.dump_path(&session)]
            .into_iter()
            .filter(|path| std::fs::File::open(path).is_err())
            .collect();

        if missing.is_empty() {
            Ok(SessionState::Active(session))
        } else {
            tracing::warn!("session artifacts missing: {missing:?}");
            Ok(SessionState::Lost { session, missing })
        }
    }

    /// The active session, or the error matching the actual state.
    pub fn require_active(&self) -> Result<Session, SyncError> {
        match self.state()? {
            SessionState::Active(session) => Ok(session),
            SessionState::Lost { missing, .. } => Err(SyncError::SessionLost { missing }),
            SessionState::Absent => Err(SyncError::NoSession {
                staging_dir: self.staging_dir.clone(),
            }),
        }
    }

    /// Whether the dump differs from what the query wrote.
    pub fn dump_modified(&self, session: &Session) -> Result<bool, SyncError> {
        let path = self.dump_path(session);
        let contents = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
        Ok(content_checksum(&contents) != session.dump_checksum)
    }

    /// Remove the session record and every artifact. Returns whether anything
    /// was removed; clearing an absent session is not an error.
    pub fn clear(&self) -> Result<bool, SyncError> {
        let mut names = vec![
            SESSION_FILE.to_string(),
            SNAPSHOT_FILE.to_string(),
            dump_file_name(DumpShape::Array),
            dump_file_name(DumpShape::Lines),
        ];
        // A corrupt record still gets removed, just without its artifact names.
        if let Ok(Some(session)) = self.load() {
            names.push(session.snapshot_file);
            names.push(session.dump_file);
        }
        names.sort();
        names.dedup();

        let mut removed = false;
        for name in names {
            let path = self.staging_dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("removed: {}", path.display());
                    removed = true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&path, e)),
            }
        }
        // Leave the directory behind if anything else lives there.
        let _ = std::fs::remove_dir(&self.staging_dir);
        Ok(removed)
    }
}

/// Hex SHA-256 of raw file content.
pub(crate) fn content_checksum(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_core::Document;
    use tempfile::TempDir;

    fn params() -> QueryParams {
        QueryParams {
            filter: Document::new().with("status", "open").with("n", 5i64),
            sort: vec![SortKey::descending("age"), SortKey::ascending("name")],
            projection: Document::new().with("secret", 0),
            limit: 10,
            ..QueryParams::new("/data", "shop", "orders")
        }
    }

    fn session() -> Session {
        Session {
            query: StoredQuery::from_params(&params()).unwrap(),
            created_at: Utc::now(),
            snapshot_file: SNAPSHOT_FILE.to_string(),
            dump_file: dump_file_name(DumpShape::Array),
            dump_mode: Mode::Canonical,
            dump_shape: DumpShape::Array,
            documents: 0,
            skipped: 0,
            dump_checksum: content_checksum(b"[]\n"),
        }
    }

    fn write_artifacts(manager: &SessionManager, session: &Session) {
        std::fs::write(manager.snapshot_path(session), "").unwrap();
        std::fs::write(manager.dump_path(session), "[]\n").unwrap();
    }

    #[test]
    fn stored_query_roundtrip_keeps_types_and_sort_order() {
        let stored = StoredQuery::from_params(&params()).unwrap();
        assert_eq!(stored.filter, r#"{"n":{"$numberLong":"5"},"status":"open"}"#);
        assert_eq!(stored.sort, vec!["-age", "name"]);
        assert_eq!(stored.to_params().unwrap(), params());
    }

    #[test]
    fn absent_without_record() {
        let tmp = TempDir::new().unwrap();
        let manager = SessionManager::new(tmp.path().join(".docpatch"));
        assert_eq!(manager.state().unwrap(), SessionState::Absent);
        assert!(matches!(manager.require_active(), Err(SyncError::NoSession { .. })));
    }

    #[test]
    fn active_when_artifacts_exist() {
        let tmp = TempDir::new().unwrap();
        let manager = SessionManager::new(tmp.path());
        let session = session();
        manager.save(&session).unwrap();
        write_artifacts(&manager, &session);

        assert_eq!(manager.state().unwrap(), SessionState::Active(session.clone()));
        assert_eq!(manager.require_active().unwrap(), session);
        assert!(!manager.dump_modified(&session).unwrap());
    }

    #[test]
    fn lost_when_dump_deleted() {
        let tmp = TempDir::new().unwrap();
        let manager = SessionManager::new(tmp.path());
        let session = session();
        manager.save(&session).unwrap();
        write_artifacts(&manager, &session);
        std::fs::remove_file(manager.dump_path(&session)).unwrap();

        match manager.state().unwrap() {
            SessionState::Lost { missing, .. } => {
                assert_eq!(missing, vec![manager.dump_path(&session)]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(manager.require_active(), Err(SyncError::SessionLost { .. })));
    }

    #[test]
    fn edited_dump_is_detected() {
        let tmp = TempDir::new().unwrap();
        let manager = SessionManager::new(tmp.path());
        let session = session();
        manager.save(&session).unwrap();
        write_artifacts(&manager, &session);
        std::fs::write(manager.dump_path(&session), "[{\"_id\": \"x\"}]\n").unwrap();
        assert!(manager.dump_modified(&session).unwrap());
    }

    #[test]
    fn clear_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let staging = tmp.path().join(".docpatch");
        let manager = SessionManager::new(&staging);
        std::fs::create_dir_all(&staging).unwrap();
        let session = session();
        manager.save(&session).unwrap();
        write_artifacts(&manager, &session);

        assert!(manager.clear().unwrap());
        assert_eq!(manager.state().unwrap(), SessionState::Absent);
        assert!(!staging.exists());
        assert!(!manager.clear().unwrap());
    }

    #[test]
    fn corrupt_record_is_reported_and_clearable() {
        let tmp = TempDir::new().unwrap();
        let manager = SessionManager::new(tmp.path());
        std::fs::write(manager.session_path(), "query: [unterminated").unwrap();
        assert!(matches!(manager.state(), Err(SyncError::SessionParse { .. })));
        assert!(manager.clear().unwrap());
    }
}
