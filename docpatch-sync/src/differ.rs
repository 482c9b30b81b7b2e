//! Reconciliation — classify an edited document set against a snapshot.
//!
//! Output order: one entry per edited document in input order
//! (`Added`/`Updated`/`Noop`), then `Deleted` for every snapshot identifier
//! the edited set no longer mentions, in ascending identifier order.

use std::collections::HashSet;

use docpatch_core::{Change, Document};

use crate::error::DiffError;
use crate::hasher::Hasher;
use crate::snapshot::Snapshot;

/// Compare `destination` (the edited set) with `source` (the snapshot).
///
/// Any document without a usable identity, or one that cannot be encoded,
/// fails the whole pass.
pub fn diff(
    hasher: &Hasher,
    source: &Snapshot,
    destination: &[Document],
) -> Result<Vec<Change>, DiffError> {
    let mut seen: HashSet<String> = HashSet::with_capacity(destination.len());
    let mut changes = Vec::with_capacity(destination.len() + source.len());

    for (index, document) in destination.iter().enumerate() {
        let fingerprint = hasher
            .fingerprint(document)
            .map_err(|source| DiffError::Document { index, source })?;
        let identifier = fingerprint.identifier();

        if !seen.insert(identifier.clone()) {
            return Err(DiffError::DuplicateIdentifier { index, identifier });
        }

        let identity = fingerprint.identity;
        let change = match source.get(&identifier) {
            None => Change::Added {
                identity,
                document: document.clone(),
            },
            Some(previous) if previous.checksum == fingerprint.checksum => {
                Change::Noop { identity }
            }
            Some(_) => Change::Updated {
                identity,
                document: document.clone(),
            },
        };
        tracing::debug!("{identifier}: {}", change.kind());
        changes.push(change);
    }

    for (identifier, fingerprint) in source.iter() {
        if !seen.contains(identifier) {
            tracing::debug!("{identifier}: deleted");
            changes.push(Change::Deleted {
                identity: fingerprint.identity.clone(),
            });
        }
    }

    Ok(changes)
}
