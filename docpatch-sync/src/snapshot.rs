//! Snapshot store — fingerprints of the documents a query returned.
//!
//! Persisted as one fingerprint per line, sorted by identifier:
//!
//! ```text
//! _id "a" 2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae
//! _id ObjectId("64b7f0c2a1b2c3d4e5f60718") fcde2b2edba56bf408601fb721fe9b5c338d10ee429ea04fae5511b68fbf8fb9
//! ```
//!
//! Blank lines are ignored on load. The file is replaced atomically.

use std::collections::BTreeMap;
use std::path::Path;

use docpatch_core::{Change, CoreError, Fingerprint};

use crate::error::{io_err, HashError, SyncError};
use crate::hasher::Hasher;
use crate::writer::{atomic_write, WriteResult};

/// Identifier string → fingerprint, iterated in identifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, Fingerprint>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the fingerprint's identifier, returning any previous entry.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(fingerprint.identifier(), fingerprint)
    }

    pub fn get(&self, identifier: &str) -> Option<&Fingerprint> {
        self.entries.get(identifier)
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Fingerprint> {
        self.entries.remove(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Fingerprint)> {
        self.entries.iter()
    }

    /// Bring the snapshot in line with a change that reached the store.
    ///
    /// `Added`/`Updated` record the edited document's fingerprint, `Deleted`
    /// drops the entry, so the next reconciliation sees these as unchanged.
    pub fn record_applied(&mut self, hasher: &Hasher, change: &Change) -> Result<(), HashError> {
        match change {
            Change::Added { document, .. } | Change::Updated { document, .. } => {
                self.insert(hasher.fingerprint(document)?);
            }
            Change::Deleted { identity } => {
                self.remove(&identity.to_string());
            }
            Change::Noop { .. } => {}
        }
        Ok(())
    }

    /// Render the line-oriented file form.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for fingerprint in self.entries.values() {
            out.push_str(&fingerprint.to_string());
            out.push('\n');
        }
        out
    }

    /// Parse the file form. Errors carry the 1-based line number.
    pub fn parse(text: &str) -> Result<Self, (usize, CoreError)> {
        let mut snapshot = Self::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fingerprint: Fingerprint = line.parse().map_err(|e| (i + 1, e))?;
            snapshot.insert(fingerprint);
        }
        Ok(snapshot)
    }
}

impl FromIterator<Fingerprint> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for fingerprint in iter {
            snapshot.insert(fingerprint);
        }
        snapshot
    }
}

/// Load a snapshot file. A missing file is an error; the session layer
/// reports that case before anything gets here.
pub fn load_at(path: &Path) -> Result<Snapshot, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Snapshot::parse(&contents).map_err(|(line, source)| SyncError::Snapshot {
        path: path.to_path_buf(),
        line,
        source,
    })
}

/// Save a snapshot atomically.
pub fn save_at(path: &Path, snapshot: &Snapshot) -> Result<WriteResult, SyncError> {
    let result = atomic_write(path, &snapshot.to_text()).map_err(|e| io_err(path, e))?;
    tracing::info!("snapshot: {} fingerprint(s) -> {}", snapshot.len(), path.display());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_core::{Document, EngineConfig, IdentifierValue, Identity, ObjectId};
    use tempfile::TempDir;

    fn fp(id: &str, checksum: &str) -> Fingerprint {
        Fingerprint::new(
            Identity::new("_id", IdentifierValue::String(id.into())),
            checksum,
        )
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("snapshot.fp");
        let oid = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap();
        let snapshot: Snapshot = vec![
            fp("b", "bb"),
            fp("with space", "cc"),
            Fingerprint::new(Identity::new("_id", IdentifierValue::ObjectId(oid)), "dd"),
        ]
        .into_iter()
        .collect();

        save_at(&path, &snapshot).unwrap();
        let loaded = load_at(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn lines_are_sorted_by_identifier() {
        let snapshot: Snapshot = vec![fp("b", "2"), fp("a", "1")].into_iter().collect();
        assert_eq!(snapshot.to_text(), "_id \"a\" 1\n_id \"b\" 2\n");
    }

    #[test]
    fn blank_lines_ignored() {
        let snapshot = Snapshot::parse("\n_id \"a\" 1\n   \n_id \"b\" 2\n\n").unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("snapshot.fp");
        std::fs::write(&path, "_id \"a\" 1\n\ngarbage\n").unwrap();

        match load_at(&path).unwrap_err() {
            SyncError::Snapshot { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_at(&tmp.path().join("absent.fp")).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[test]
    fn record_applied_tracks_store_state() {
        let hasher = Hasher::from_config(&EngineConfig::default());
        let kept = Document::new().with("_id", "a").with("v", 1);
        let gone = Document::new().with("_id", "b");
        let mut snapshot: Snapshot = [&kept, &gone]
            .into_iter()
            .map(|d| hasher.fingerprint(d).unwrap())
            .collect();

        let edited = Document::new().with("_id", "a").with("v", 2);
        let updated = Change::Updated {
            identity: hasher.identify(&edited).unwrap(),
            document: edited.clone(),
        };
        let deleted = Change::Deleted {
            identity: hasher.identify(&gone).unwrap(),
        };
        snapshot.record_applied(&hasher, &updated).unwrap();
        snapshot.record_applied(&hasher, &deleted).unwrap();

        assert_eq!(snapshot.len(), 1);
        let entry = snapshot.get("_id \"a\"").unwrap();
        assert_eq!(entry, &hasher.fingerprint(&edited).unwrap());
    }
}
