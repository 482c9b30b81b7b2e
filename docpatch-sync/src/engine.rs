//! Engine — the pipeline entry points used by the CLI.
//!
//! ```text
//! query ──▶ snapshot.fp + dump ──▶ (user edits dump) ──▶ reconcile ──▶ review / apply / emit
//!                                                               ▲
//! recover (session lost) ───────────────────────────────────────┘
//! ```
//!
//! The engine owns an [`EngineConfig`]; nothing is read from process-wide
//! state. Stores are passed in per call.

use std::path::PathBuf;

use chrono::Utc;

use docpatch_codec::{read_dump, write_dump, DumpFormat};
use docpatch_core::{Change, ChangeCounts, Document, EngineConfig, QueryParams};

use crate::apply::{apply_changes, ApplyReport};
use crate::differ::diff;
use crate::error::{io_err, HashError, SyncError};
use crate::hasher::Hasher;
use crate::restore::{CommandEmission, RestoreStrategy};
use crate::session::{
    content_checksum, dump_file_name, Session, SessionManager, SessionState, StoredQuery,
    SNAPSHOT_FILE,
};
use crate::snapshot::{self, Snapshot};
use crate::store::DocumentStore;
use crate::writer::atomic_write;

/// What a query (or recovery) left in the staging directory.
#[derive(Debug)]
pub struct QueryOutcome {
    pub session: Session,
    pub dump_path: PathBuf,
    /// Result positions left out because they could not be encoded.
    pub skipped: Vec<usize>,
    /// Recovery only: the existing dump was kept instead of rewritten.
    pub kept_dump: bool,
}

/// Reconciliation of the current dump against the snapshot.
#[derive(Debug)]
pub struct Reconciliation {
    pub session: Session,
    pub changes: Vec<Change>,
}

impl Reconciliation {
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts::tally(&self.changes)
    }
}

/// Per-kind counts plus, on request, the statements that would realise them.
#[derive(Debug)]
pub struct Review {
    pub counts: ChangeCounts,
    pub changes: Vec<Change>,
    pub statements: Vec<String>,
}

/// Session state plus whether the dump has been edited since it was written.
#[derive(Debug)]
pub struct Status {
    pub state: SessionState,
    /// `None` unless the session is active.
    pub dump_modified: Option<bool>,
}

pub struct Engine {
    config: EngineConfig,
    hasher: Hasher,
    sessions: SessionManager,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            hasher: Hasher::from_config(&config),
            sessions: SessionManager::new(config.staging_dir.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // -----------------------------------------------------------------------
    // query / recover
    // -----------------------------------------------------------------------

    /// Run `params` against `store`, replacing any previous session.
    pub fn query(
        &self,
        store: &dyn DocumentStore,
        params: QueryParams,
    ) -> Result<QueryOutcome, SyncError> {
        let previous = self.sessions.load().ok().flatten();

        let format = DumpFormat::from(&self.config);
        let (snapshot, kept, skipped) = self.capture(store, &params)?;
        let dump_text = write_dump(&kept, &format)?;

        let session = Session {
            query: StoredQuery::from_params(&params)?,
            created_at: Utc::now(),
            snapshot_file: SNAPSHOT_FILE.to_string(),
            dump_file: dump_file_name(format.shape),
            dump_mode: format.mode,
            dump_shape: format.shape,
            documents: kept.len(),
            skipped: skipped.len(),
            dump_checksum: content_checksum(dump_text.as_bytes()),
        };

        snapshot::save_at(&self.sessions.snapshot_path(&session), &snapshot)?;
        let dump_path = self.write_dump_file(&session, &dump_text)?;
        self.sessions.save(&session)?;

        if let Some(old) = previous.filter(|old| old.dump_file != session.dump_file) {
            let stale = self.sessions.dump_path(&old);
            if std::fs::remove_file(&stale).is_ok() {
                tracing::debug!("removed stale dump: {}", stale.display());
            }
        }

        tracing::info!(
            "query {}.{}: {} document(s), {} skipped",
            params.database,
            params.collection,
            kept.len(),
            skipped.len()
        );
        Ok(QueryOutcome {
            session,
            dump_path,
            skipped,
            kept_dump: false,
        })
    }

    /// Re-run the stored query to rebuild the snapshot. A dump that is still
    /// readable is kept, so edits survive; a missing one is rewritten.
    pub fn recover(&self, store: &dyn DocumentStore) -> Result<QueryOutcome, SyncError> {
        let previous = match self.sessions.state()? {
            SessionState::Absent => {
                return Err(SyncError::NoSession {
                    staging_dir: self.sessions.staging_dir().to_path_buf(),
                })
            }
            SessionState::Active(session) | SessionState::Lost { session, .. } => session,
        };

        let params = previous.query.to_params()?;
        let (snapshot, kept, skipped) = self.capture(store, &params)?;

        let mut session = Session {
            created_at: Utc::now(),
            documents: kept.len(),
            skipped: skipped.len(),
            ..previous
        };
        snapshot::save_at(&self.sessions.snapshot_path(&session), &snapshot)?;

        let dump_path = self.sessions.dump_path(&session);
        let kept_dump = std::fs::File::open(&dump_path).is_ok();
        if kept_dump {
            tracing::info!("kept existing dump: {}", dump_path.display());
        } else {
            let format = DumpFormat {
                mode: session.dump_mode,
                shape: session.dump_shape,
                ..DumpFormat::from(&self.config)
            };
            let dump_text = write_dump(&kept, &format)?;
            session.dump_checksum = content_checksum(dump_text.as_bytes());
            self.write_dump_file(&session, &dump_text)?;
        }
        self.sessions.save(&session)?;

        Ok(QueryOutcome {
            session,
            dump_path,
            skipped,
            kept_dump,
        })
    }

    /// Fetch and fingerprint query results.
    ///
    /// With `ignore_failures`, documents that cannot be encoded are skipped;
    /// identity problems are always fatal.
    fn capture(
        &self,
        store: &dyn DocumentStore,
        params: &QueryParams,
    ) -> Result<(Snapshot, Vec<Document>, Vec<usize>), SyncError> {
        let results = store.find(params)?;

        let mut snapshot = Snapshot::new();
        let mut kept = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (index, doc) in results.into_iter().enumerate() {
            match self.hasher.fingerprint(&doc) {
                Ok(fingerprint) => {
                    let identifier = fingerprint.identifier();
                    if snapshot.insert(fingerprint).is_some() {
                        return Err(SyncError::DuplicateIdentifier { identifier });
                    }
                    kept.push(doc);
                }
                Err(HashError::Encode(e)) if self.config.ignore_failures => {
                    tracing::warn!("skipping query result #{index}: {e}");
                    skipped.push(index);
                }
                Err(source) => return Err(SyncError::Hash { index, source }),
            }
        }
        Ok((snapshot, kept, skipped))
    }

    fn write_dump_file(&self, session: &Session, text: &str) -> Result<PathBuf, SyncError> {
        let path = self.sessions.dump_path(session);
        atomic_write(&path, text).map_err(|e| io_err(&path, e))?;
        tracing::info!("dump: {}", path.display());
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // session inspection
    // -----------------------------------------------------------------------

    pub fn state(&self) -> Result<SessionState, SyncError> {
        self.sessions.state()
    }

    pub fn status(&self) -> Result<Status, SyncError> {
        let state = self.sessions.state()?;
        let dump_modified = match &state {
            SessionState::Active(session) => Some(self.sessions.dump_modified(session)?),
            _ => None,
        };
        Ok(Status {
            state,
            dump_modified,
        })
    }

    /// Path of the active session's dump.
    pub fn dump_path(&self) -> Result<PathBuf, SyncError> {
        let session = self.sessions.require_active()?;
        Ok(self.sessions.dump_path(&session))
    }

    pub fn clear(&self) -> Result<bool, SyncError> {
        self.sessions.clear()
    }

    // -----------------------------------------------------------------------
    // reconcile / review / apply
    // -----------------------------------------------------------------------

    /// Diff the dump against the snapshot.
    pub fn reconcile(&self) -> Result<Reconciliation, SyncError> {
        let session = self.sessions.require_active()?;

        let snapshot = snapshot::load_at(&self.sessions.snapshot_path(&session))?;
        let dump_path = self.sessions.dump_path(&session);
        let text = std::fs::read_to_string(&dump_path).map_err(|e| io_err(&dump_path, e))?;
        let documents = read_dump(&text, session.dump_shape).map_err(|source| SyncError::Dump {
            path: dump_path.clone(),
            source,
        })?;

        let changes = diff(&self.hasher, &snapshot, &documents)?;
        Ok(Reconciliation { session, changes })
    }

    /// Counts, and with `emit` the statements for every actionable change.
    pub fn review(&self, emit: bool) -> Result<Review, SyncError> {
        let Reconciliation { session, changes } = self.reconcile()?;
        let statements = if emit {
            self.statements(&session, &changes)?
        } else {
            Vec::new()
        };
        Ok(Review {
            counts: ChangeCounts::tally(&changes),
            changes,
            statements,
        })
    }

    /// Statements that would realise the pending changes.
    pub fn emit(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.review(true)?.statements)
    }

    fn statements(&self, session: &Session, changes: &[Change]) -> Result<Vec<String>, SyncError> {
        let strategy = CommandEmission::new(session.query.collection.clone(), self.config.command_mode);
        Ok(strategy
            .build_all(changes)?
            .into_iter()
            .map(|(_, statement)| statement)
            .collect())
    }

    /// Apply pending changes to `store`, then record the successful ones in
    /// the snapshot so a second pass sees them as unchanged.
    pub fn apply(&self, store: &mut dyn DocumentStore) -> Result<ApplyReport, SyncError> {
        let Reconciliation { session, changes } = self.reconcile()?;
        let namespace = session.query.to_params()?.namespace();
        let report = apply_changes(store, &namespace, &changes);

        let actionable = changes.iter().filter(|c| !c.is_noop());
        let applied: Vec<&Change> = actionable
            .zip(&report.outcomes)
            .filter(|(_, outcome)| outcome.succeeded())
            .map(|(change, _)| change)
            .collect();

        if !applied.is_empty() {
            let path = self.sessions.snapshot_path(&session);
            let mut snapshot = snapshot::load_at(&path)?;
            for (index, change) in applied.into_iter().enumerate() {
                snapshot
                    .record_applied(&self.hasher, change)
                    .map_err(|source| SyncError::Hash { index, source })?;
            }
            snapshot::save_at(&path, &snapshot)?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use docpatch_core::{ChangeKind, Decimal128, DumpShape, Namespace, Value};
    use tempfile::TempDir;

    fn ns() -> Namespace {
        Namespace::new("shop", "orders")
    }

    fn params() -> QueryParams {
        QueryParams::new("mem", "shop", "orders")
    }

    fn store() -> MemoryStore {
        MemoryStore::with_documents(
            ns(),
            vec![
                Document::new().with("_id", "a").with("v", 1),
                Document::new().with("_id", "b").with("v", 2),
            ],
        )
    }

    fn engine(tmp: &TempDir) -> Engine {
        Engine::new(EngineConfig::with_staging_dir(tmp.path().join(".docpatch"))).unwrap()
    }

    #[test]
    fn query_writes_all_artifacts() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let outcome = engine.query(&store(), params()).unwrap();

        assert_eq!(outcome.session.documents, 2);
        assert!(outcome.dump_path.ends_with("dump.json"));
        assert!(matches!(engine.state().unwrap(), SessionState::Active(_)));
        let counts = engine.reconcile().unwrap().counts();
        assert_eq!(counts.unchanged, 2);
    }

    #[test]
    fn unencodable_results_fail_or_skip() {
        let tmp = TempDir::new().unwrap();
        let mut docs = store();
        docs.insert_one(
            &ns(),
            Document::new()
                .with("_id", "bad")
                .with("d", Value::Decimal128(Decimal128::new("??"))),
        )
        .unwrap();

        let strict = engine(&tmp);
        let err = strict.query(&docs, params()).unwrap_err();
        assert!(matches!(err, SyncError::Hash { index: 2, .. }), "got: {err}");

        let lenient = Engine::new(EngineConfig {
            ignore_failures: true,
            ..EngineConfig::with_staging_dir(tmp.path().join(".docpatch"))
        })
        .unwrap();
        let outcome = lenient.query(&docs, params()).unwrap();
        assert_eq!(outcome.skipped, vec![2]);
        assert_eq!(outcome.session.documents, 2);
    }

    #[test]
    fn missing_identity_is_fatal_even_when_ignoring_failures() {
        let tmp = TempDir::new().unwrap();
        let docs = MemoryStore::with_documents(ns(), vec![Document::new().with("name", "x")]);
        let engine = Engine::new(EngineConfig {
            ignore_failures: true,
            ..EngineConfig::with_staging_dir(tmp.path())
        })
        .unwrap();
        assert!(matches!(
            engine.query(&docs, params()),
            Err(SyncError::Hash { index: 0, source: HashError::NoIdentifier { .. } })
        ));
    }

    #[test]
    fn requery_with_new_shape_removes_old_dump() {
        let tmp = TempDir::new().unwrap();
        let first = engine(&tmp);
        let old = first.query(&store(), params()).unwrap().dump_path;

        let second = Engine::new(EngineConfig {
            dump_shape: DumpShape::Lines,
            ..EngineConfig::with_staging_dir(tmp.path().join(".docpatch"))
        })
        .unwrap();
        let new = second.query(&store(), params()).unwrap().dump_path;
        assert!(!old.exists());
        assert!(new.ends_with("dump.jsonl"));
    }

    #[test]
    fn apply_then_reconcile_is_all_noop() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let mut docs = store();
        let outcome = engine.query(&docs, params()).unwrap();

        std::fs::write(
            &outcome.dump_path,
            r#"[{"_id": "b", "v": 3}, {"_id": "c", "v": 4}]"#,
        )
        .unwrap();

        let review = engine.review(true).unwrap();
        assert_eq!(
            (review.counts.updated, review.counts.added, review.counts.deleted),
            (1, 1, 1)
        );
        assert_eq!(review.statements.len(), 3);
        assert!(engine.status().unwrap().dump_modified.unwrap());

        let report = engine.apply(&mut docs).unwrap();
        assert!(report.is_clean());
        assert_eq!(docs.documents(&ns()).len(), 2);

        let again = engine.reconcile().unwrap();
        assert!(again.changes.iter().all(Change::is_noop));
        assert!(engine.apply(&mut docs).unwrap().outcomes.is_empty());
    }

    #[test]
    fn failed_changes_stay_pending() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let mut docs = store();
        let outcome = engine.query(&docs, params()).unwrap();
        std::fs::write(&outcome.dump_path, r#"[{"_id": "a", "v": 1}]"#).unwrap();

        // Someone else removes "b" first.
        docs.delete_one(&ns(), &Document::new().with("_id", "b")).unwrap();

        let report = engine.apply(&mut docs).unwrap();
        assert!(matches!(
            report.outcomes[0].error,
            Some(crate::RestoreError::TargetVanished { kind: ChangeKind::Deleted, .. })
        ));
        assert_eq!(engine.reconcile().unwrap().counts().deleted, 1);
    }

    #[test]
    fn recover_rebuilds_lost_snapshot_and_keeps_edits() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let docs = store();
        let outcome = engine.query(&docs, params()).unwrap();
        let edited = r#"[{"_id": "a", "v": 10}]"#;
        std::fs::write(&outcome.dump_path, edited).unwrap();
        std::fs::remove_file(engine.sessions().snapshot_path(&outcome.session)).unwrap();

        assert!(matches!(engine.reconcile(), Err(SyncError::SessionLost { .. })));

        let recovered = engine.recover(&docs).unwrap();
        assert!(recovered.kept_dump);
        assert_eq!(std::fs::read_to_string(&recovered.dump_path).unwrap(), edited);
        let counts = engine.reconcile().unwrap().counts();
        assert_eq!((counts.updated, counts.deleted), (1, 1));
    }

    #[test]
    fn recover_rewrites_missing_dump() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let docs = store();
        let outcome = engine.query(&docs, params()).unwrap();
        std::fs::remove_file(&outcome.dump_path).unwrap();

        let recovered = engine.recover(&docs).unwrap();
        assert!(!recovered.kept_dump);
        assert!(matches!(engine.state().unwrap(), SessionState::Active(_)));
        assert!(!engine.status().unwrap().dump_modified.unwrap());
    }

    #[test]
    fn absent_session_errors() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        assert!(matches!(engine.reconcile(), Err(SyncError::NoSession { .. })));
        assert!(matches!(engine.recover(&store()), Err(SyncError::NoSession { .. })));
        assert!(!engine.clear().unwrap());
    }
}
