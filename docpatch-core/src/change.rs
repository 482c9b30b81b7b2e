//! Reconciliation output.

use std::fmt;

use crate::identity::Identity;
use crate::types::Document;

/// Classification of one identity after comparing a snapshot with an edited set.
///
/// Only `Added` and `Updated` carry the edited document.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Noop { identity: Identity },
    Updated { identity: Identity, document: Document },
    Added { identity: Identity, document: Document },
    Deleted { identity: Identity },
}

/// Payload-free discriminant of [`Change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Noop,
    Updated,
    Added,
    Deleted,
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Noop { .. } => ChangeKind::Noop,
            Change::Updated { .. } => ChangeKind::Updated,
            Change::Added { .. } => ChangeKind::Added,
            Change::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Change::Noop { identity }
            | Change::Updated { identity, .. }
            | Change::Added { identity, .. }
            | Change::Deleted { identity } => identity,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Change::Updated { document, .. } | Change::Added { document, .. } => Some(document),
            Change::Noop { .. } | Change::Deleted { .. } => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Change::Noop { .. })
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Noop => write!(f, "unchanged"),
            ChangeKind::Updated => write!(f, "updated"),
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// Per-kind totals for a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ChangeCounts {
    pub fn tally(changes: &[Change]) -> Self {
        let mut counts = Self::default();
        for change in changes {
            match change.kind() {
                ChangeKind::Added => counts.added += 1,
                ChangeKind::Updated => counts.updated += 1,
                ChangeKind::Deleted => counts.deleted += 1,
                ChangeKind::Noop => counts.unchanged += 1,
            }
        }
        counts
    }

    /// Changes that would touch the store.
    pub fn actionable(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentifierValue;

    fn id(v: &str) -> Identity {
        Identity::new("_id", IdentifierValue::String(v.into()))
    }

    #[test]
    fn only_added_and_updated_carry_documents() {
        let doc = Document::new().with("_id", "a");
        let changes = [
            Change::Noop { identity: id("a") },
            Change::Updated { identity: id("a"), document: doc.clone() },
            Change::Added { identity: id("a"), document: doc },
            Change::Deleted { identity: id("a") },
        ];
        let with_docs: Vec<_> = changes.iter().map(|c| c.document().is_some()).collect();
        assert_eq!(with_docs, vec![false, true, true, false]);
    }

    #[test]
    fn tally_counts_each_kind() {
        let changes = vec![
            Change::Noop { identity: id("a") },
            Change::Deleted { identity: id("b") },
            Change::Deleted { identity: id("c") },
            Change::Added { identity: id("d"), document: Document::new() },
        ];
        let counts = ChangeCounts::tally(&changes);
        assert_eq!(
            counts,
            ChangeCounts { added: 1, updated: 0, deleted: 2, unchanged: 1 }
        );
        assert_eq!(counts.actionable(), 3);
    }
}
