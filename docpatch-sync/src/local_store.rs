//! Directory-backed document store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<database>/<collection>.jsonl   one canonical document per line
//! ```
//!
//! Every mutation loads the collection, changes it in memory and rewrites
//! the whole file through [`atomic_write`]. A root that does not exist (or
//! disappears mid-batch) is reported as [`StoreError::Unreachable`].

use std::path::{Path, PathBuf};

use docpatch_codec::{read_dump, write_dump, DumpFormat};
use docpatch_core::{Document, DumpShape, Mode, Namespace, QueryParams};

use crate::error::{store_io_err, StoreError};
use crate::store::{delete_from, insert_into, run_query, update_in, DocumentStore, UpdateOutcome};
use crate::writer::atomic_write;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open the store rooted at `target`, which must be an existing directory.
    pub fn open(target: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            root: target.as_ref().to_path_buf(),
        };
        store.ensure_reachable()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<database>/<collection>.jsonl` — pure, no I/O.
    pub fn collection_path(&self, namespace: &Namespace) -> PathBuf {
        self.root
            .join(&namespace.database)
            .join(format!("{}.jsonl", namespace.collection))
    }

    fn ensure_reachable(&self) -> Result<(), StoreError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Unreachable {
                target: self.root.display().to_string(),
                reason: "not a directory".to_string(),
            })
        }
    }

    /// Load a collection; a missing file is an empty collection.
    pub fn load(&self, namespace: &Namespace) -> Result<Vec<Document>, StoreError> {
        self.ensure_reachable()?;
        let path = self.collection_path(namespace);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_io_err(&path, e)),
        };
        read_dump(&text, DumpShape::Lines).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// Replace a collection's contents.
    pub fn save(&self, namespace: &Namespace, docs: &[Document]) -> Result<(), StoreError> {
        self.ensure_reachable()?;
        let path = self.collection_path(namespace);
        let text = write_dump(docs, &DumpFormat::new(Mode::Canonical, DumpShape::Lines))?;
        atomic_write(&path, &text).map_err(|e| store_io_err(&path, e))?;
        Ok(())
    }
}

impl DocumentStore for LocalStore {
    fn find(&self, query: &QueryParams) -> Result<Vec<Document>, StoreError> {
        let docs = self.load(&query.namespace())?;
        run_query(&docs, query)
    }

    fn insert_one(&mut self, namespace: &Namespace, document: Document) -> Result<(), StoreError> {
        let mut docs = self.load(namespace)?;
        insert_into(&mut docs, document)?;
        self.save(namespace, &docs)
    }

    fn update_one(
        &mut self,
        namespace: &Namespace,
        filter: &Document,
        fields: &Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut docs = self.load(namespace)?;
        let outcome = update_in(&mut docs, filter, fields);
        if outcome.modified > 0 {
            self.save(namespace, &docs)?;
        }
        Ok(outcome)
    }

    fn delete_one(&mut self, namespace: &Namespace, filter: &Document) -> Result<u64, StoreError> {
        let mut docs = self.load(namespace)?;
        let deleted = delete_from(&mut docs, filter);
        if deleted > 0 {
            self.save(namespace, &docs)?;
        }
        Ok(deleted)
    }
}
