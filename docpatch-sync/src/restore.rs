//! Restore strategies — turn a [`Change`] into something that realises it.
//!
//! | strategy            | action      | realised by                     |
//! |---------------------|-------------|---------------------------------|
//! | [`DirectApply`]     | [`WriteOp`] | [`WriteOp::execute`] on a store |
//! | [`CommandEmission`] | `String`    | the user, in a database shell   |
//!
//! `Noop` changes build [`Built::Noop`]; nothing is ever produced for them.

use docpatch_codec::{encode_document, EncodeOptions};
use docpatch_core::{Change, ChangeKind, Document, Identity, Mode, Namespace};

use crate::error::{RestoreError, StoreError};
use crate::store::DocumentStore;

/// What a strategy built for one change.
#[derive(Debug, Clone, PartialEq)]
pub enum Built<A> {
    Action(A),
    Noop,
}

impl<A> Built<A> {
    pub fn into_action(self) -> Option<A> {
        match self {
            Built::Action(action) => Some(action),
            Built::Noop => None,
        }
    }
}

/// A way of realising changes.
pub trait RestoreStrategy {
    type Action;

    fn build(&self, change: &Change) -> Result<Built<Self::Action>, RestoreError>;

    /// Build every non-`Noop` change, in order, pairing each with its change.
    fn build_all<'c>(
        &self,
        changes: &'c [Change],
    ) -> Result<Vec<(&'c Change, Self::Action)>, RestoreError> {
        let mut actions = Vec::new();
        for change in changes.iter().filter(|c| !c.is_noop()) {
            if let Built::Action(action) = self.build(change)? {
                actions.push((change, action));
            }
        }
        Ok(actions)
    }
}

/// Payload minus the identity field, for `$set`.
fn set_fields(identity: &Identity, document: &Document) -> Document {
    let mut fields = document.clone();
    fields.remove(&identity.identified_by);
    fields
}

// ---------------------------------------------------------------------------
// DirectApply
// ---------------------------------------------------------------------------

/// One store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    UpdateOne {
        identity: Identity,
        filter: Document,
        fields: Document,
    },
    InsertOne {
        identity: Identity,
        document: Document,
    },
    DeleteOne {
        identity: Identity,
        filter: Document,
    },
}

impl WriteOp {
    pub fn identity(&self) -> &Identity {
        match self {
            WriteOp::UpdateOne { identity, .. }
            | WriteOp::InsertOne { identity, .. }
            | WriteOp::DeleteOne { identity, .. } => identity,
        }
    }

    /// Run against `store`. A zero-match update or delete is
    /// [`RestoreError::TargetVanished`]; an `_id` clash on insert is
    /// [`RestoreError::AlreadyExists`]. Other store errors pass through.
    pub fn execute(
        &self,
        store: &mut dyn DocumentStore,
        namespace: &Namespace,
    ) -> Result<(), RestoreError> {
        match self {
            WriteOp::UpdateOne {
                identity,
                filter,
                fields,
            } => {
                let outcome = store.update_one(namespace, filter, fields)?;
                if outcome.matched == 0 {
                    return Err(RestoreError::TargetVanished {
                        identity: identity.to_string(),
                        kind: ChangeKind::Updated,
                    });
                }
            }
            WriteOp::InsertOne { identity, document } => {
                match store.insert_one(namespace, document.clone()) {
                    Ok(()) => {}
                    Err(StoreError::DuplicateKey { .. }) => {
                        return Err(RestoreError::AlreadyExists {
                            identity: identity.to_string(),
                        })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            WriteOp::DeleteOne { identity, filter } => {
                if store.delete_one(namespace, filter)? == 0 {
                    return Err(RestoreError::TargetVanished {
                        identity: identity.to_string(),
                        kind: ChangeKind::Deleted,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Builds [`WriteOp`]s for immediate execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectApply;

impl RestoreStrategy for DirectApply {
    type Action = WriteOp;

    fn build(&self, change: &Change) -> Result<Built<WriteOp>, RestoreError> {
        let op = match change {
            Change::Noop { .. } => return Ok(Built::Noop),
            Change::Updated { identity, document } => WriteOp::UpdateOne {
                identity: identity.clone(),
                filter: identity.filter(),
                fields: set_fields(identity, document),
            },
            Change::Added { identity, document } => WriteOp::InsertOne {
                identity: identity.clone(),
                document: document.clone(),
            },
            Change::Deleted { identity } => WriteOp::DeleteOne {
                identity: identity.clone(),
                filter: identity.filter(),
            },
        };
        Ok(Built::Action(op))
    }
}

// ---------------------------------------------------------------------------
// CommandEmission
// ---------------------------------------------------------------------------

/// Builds database shell statements, one per change:
///
/// ```text
/// db.getCollection("orders").updateOne({"_id": "b"}, {"$set": {"v": 3}});
/// db.getCollection("orders").insertOne({"_id": "c", "v": 9});
/// db.getCollection("orders").deleteOne({"_id": "a"});
/// ```
#[derive(Debug, Clone)]
pub struct CommandEmission {
    collection: String,
    options: EncodeOptions,
}

impl CommandEmission {
    /// Payloads rendered compact in `mode`.
    pub fn new(collection: impl Into<String>, mode: Mode) -> Self {
        Self {
            collection: collection.into(),
            options: EncodeOptions::new(mode, true),
        }
    }

    fn render(&self, identity: &Identity, doc: &Document) -> Result<String, RestoreError> {
        encode_document(doc, &self.options).map_err(|source| RestoreError::Encode {
            identity: identity.to_string(),
            source,
        })
    }

    fn statement(&self, method: &str, args: &str) -> String {
        let name = serde_json::Value::String(self.collection.clone());
        format!("db.getCollection({name}).{method}({args});")
    }
}

impl RestoreStrategy for CommandEmission {
    type Action = String;

    fn build(&self, change: &Change) -> Result<Built<String>, RestoreError> {
        let statement = match change {
            Change::Noop { .. } => return Ok(Built::Noop),
            Change::Updated { identity, document } => {
                let filter = self.render(identity, &identity.filter())?;
                let fields = self.render(identity, &set_fields(identity, document))?;
                self.statement("updateOne", &format!("{filter}, {{\"$set\": {fields}}}"))
            }
            Change::Added { identity, document } => {
                self.statement("insertOne", &self.render(identity, document)?)
            }
            Change::Deleted { identity } => {
                self.statement("deleteOne", &self.render(identity, &identity.filter())?)
            }
        };
        Ok(Built::Action(statement))
    }
}
