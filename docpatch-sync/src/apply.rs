//! Apply pipeline — execute a change set against a store.
//!
//! Operations run one at a time, in change order, with no transaction.
//! A per-change failure (vanished target, key clash) is recorded and the
//! batch continues. A store failure stops the batch; writes made before it
//! stay in place and the remaining changes are counted as not attempted.

use docpatch_core::{Change, ChangeKind, Identity, Namespace};

use crate::error::{RestoreError, StoreError};
use crate::restore::{DirectApply, RestoreStrategy};
use crate::store::DocumentStore;

/// Result of one attempted change.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub identity: Identity,
    pub kind: ChangeKind,
    pub error: Option<RestoreError>,
}

impl ApplyOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// The change whose store failure stopped a batch.
#[derive(Debug)]
pub struct Aborted {
    pub identity: Identity,
    pub kind: ChangeKind,
    pub error: StoreError,
}

/// Everything that happened during one batch.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Completed changes, successful or not, in order.
    pub outcomes: Vec<ApplyOutcome>,
    pub aborted: Option<Aborted>,
    /// Changes after the aborted one, never attempted.
    pub not_attempted: usize,
}

impl ApplyReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ApplyOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ApplyOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// Every actionable change went through.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.outcomes.iter().all(ApplyOutcome::succeeded)
    }
}

/// Realise `changes` in `namespace` with [`DirectApply`].
///
/// `Noop` changes are skipped and do not appear in the report.
pub fn apply_changes(
    store: &mut dyn DocumentStore,
    namespace: &Namespace,
    changes: &[Change],
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let actionable: Vec<&Change> = changes.iter().filter(|c| !c.is_noop()).collect();

    for (position, change) in actionable.iter().enumerate() {
        let result = DirectApply.build(change).and_then(|built| match built.into_action() {
            Some(op) => op.execute(store, namespace),
            None => Ok(()),
        });

        let identity = change.identity().clone();
        let kind = change.kind();
        match result {
            Ok(()) => {
                tracing::info!("{kind} {identity}");
                report.outcomes.push(ApplyOutcome {
                    identity,
                    kind,
                    error: None,
                });
            }
            Err(RestoreError::Store(error)) => {
                tracing::warn!("{kind} {identity}: {error}; stopping");
                report.not_attempted = actionable.len() - position - 1;
                report.aborted = Some(Aborted {
                    identity,
                    kind,
                    error,
                });
                break;
            }
            Err(e) => {
                tracing::warn!("{kind} {identity}: {e}");
                report.outcomes.push(ApplyOutcome {
                    identity,
                    kind,
                    error: Some(e),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, UpdateOutcome};
    use docpatch_core::{Document, IdentifierValue, QueryParams};

    fn ns() -> Namespace {
        Namespace::new("shop", "orders")
    }

    fn identity(id: &str) -> Identity {
        Identity::new("_id", IdentifierValue::String(id.into()))
    }

    fn seeded() -> MemoryStore {
        MemoryStore::with_documents(
            ns(),
            vec![
                Document::new().with("_id", "a").with("v", 1),
                Document::new().with("_id", "b").with("v", 2),
            ],
        )
    }

    #[test]
    fn applies_all_kinds_and_skips_noops() {
        let mut store = seeded();
        let changes = vec![
            Change::Noop { identity: identity("a") },
            Change::Updated {
                identity: identity("b"),
                document: Document::new().with("_id", "b").with("v", 3),
            },
            Change::Added {
                identity: identity("c"),
                document: Document::new().with("_id", "c").with("v", 9),
            },
            Change::Deleted { identity: identity("a") },
        ];

        let report = apply_changes(&mut store, &ns(), &changes);
        assert!(report.is_clean());
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(
            store.documents(&ns()),
            &[
                Document::new().with("_id", "b").with("v", 3),
                Document::new().with("_id", "c").with("v", 9),
            ]
        );
    }

    #[test]
    fn vanished_targets_do_not_stop_the_batch() {
        let mut store = seeded();
        let changes = vec![
            Change::Deleted { identity: identity("gone") },
            Change::Updated {
                identity: identity("ghost"),
                document: Document::new().with("_id", "ghost").with("v", 0),
            },
            Change::Added {
                identity: identity("a"),
                document: Document::new().with("_id", "a"),
            },
            Change::Deleted { identity: identity("b") },
        ];

        let report = apply_changes(&mut store, &ns(), &changes);
        assert!(report.aborted.is_none());
        let failures: Vec<_> = report.failed().map(|o| o.kind).collect();
        assert_eq!(
            failures,
            vec![ChangeKind::Deleted, ChangeKind::Updated, ChangeKind::Added]
        );
        assert!(matches!(
            report.outcomes[0].error,
            Some(RestoreError::TargetVanished { kind: ChangeKind::Deleted, .. })
        ));
        assert!(matches!(report.outcomes[2].error, Some(RestoreError::AlreadyExists { .. })));
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(store.documents(&ns()).len(), 1);
    }

    /// Fails every write after the first `budget` succeed.
    struct FlakyStore {
        inner: MemoryStore,
        budget: usize,
    }

    impl FlakyStore {
        fn spend(&mut self) -> Result<(), StoreError> {
            if self.budget == 0 {
                return Err(StoreError::Unreachable {
                    target: "flaky".into(),
                    reason: "connection reset".into(),
                });
            }
            self.budget -= 1;
            Ok(())
        }
    }

    impl DocumentStore for FlakyStore {
        fn find(&self, query: &QueryParams) -> Result<Vec<Document>, StoreError> {
            self.inner.find(query)
        }

        fn insert_one(&mut self, ns: &Namespace, doc: Document) -> Result<(), StoreError> {
            self.spend()?;
            self.inner.insert_one(ns, doc)
        }

        fn update_one(
            &mut self,
            ns: &Namespace,
            filter: &Document,
            fields: &Document,
        ) -> Result<UpdateOutcome, StoreError> {
            self.spend()?;
            self.inner.update_one(ns, filter, fields)
        }

        fn delete_one(&mut self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError> {
            self.spend()?;
            self.inner.delete_one(ns, filter)
        }
    }

    #[test]
    fn store_failure_aborts_and_keeps_earlier_writes() {
        let mut store = FlakyStore {
            inner: seeded(),
            budget: 1,
        };
        let changes = vec![
            Change::Added {
                identity: identity("c"),
                document: Document::new().with("_id", "c"),
            },
            Change::Deleted { identity: identity("a") },
            Change::Deleted { identity: identity("b") },
            Change::Noop { identity: identity("x") },
        ];

        let report = apply_changes(&mut store, &ns(), &changes);
        let aborted = report.aborted.as_ref().unwrap();
        assert_eq!(aborted.identity, identity("a"));
        assert!(matches!(aborted.error, StoreError::Unreachable { .. }));
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].succeeded());
        assert_eq!(report.not_attempted, 1);
        assert_eq!(store.inner.documents(&ns()).len(), 3);
    }
}
