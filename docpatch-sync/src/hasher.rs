//! Document fingerprinting.
//!
//! The checksum is the lowercase hex SHA-256 of the document's canonical,
//! compact extended JSON. Keys are always emitted in sorted order, so the
//! checksum does not depend on how the document was built.

use sha2::{Digest, Sha256};

use docpatch_codec::{encode_document, EncodeError, EncodeOptions};
use docpatch_core::{Document, EngineConfig, Fingerprint, IdentifierValue, Identity};

use crate::error::HashError;

/// Computes identities and fingerprints with a fixed candidate list.
#[derive(Debug, Clone)]
pub struct Hasher {
    candidates: Vec<String>,
}

impl Hasher {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.identifier_candidates.clone())
    }

    /// The first candidate field present in `doc` identifies it.
    pub fn identify(&self, doc: &Document) -> Result<Identity, HashError> {
        let (field, value) = self
            .candidates
            .iter()
            .find_map(|field| doc.get(field).map(|value| (field, value)))
            .ok_or_else(|| HashError::NoIdentifier {
                candidates: self.candidates.clone(),
            })?;

        let value = IdentifierValue::from_value(value).map_err(|source| HashError::Identifier {
            field: field.clone(),
            source,
        })?;
        Ok(Identity::new(field.clone(), value))
    }

    pub fn fingerprint(&self, doc: &Document) -> Result<Fingerprint, HashError> {
        let identity = self.identify(doc)?;
        let checksum = checksum(doc)?;
        Ok(Fingerprint::new(identity, checksum))
    }
}

/// SHA-256 over the canonical compact encoding, hex-encoded.
pub fn checksum(doc: &Document) -> Result<String, EncodeError> {
    let encoded = encode_document(doc, &EncodeOptions::canonical_compact())?;
    let mut h = Sha256::new();
    h.update(encoded.as_bytes());
    Ok(hex::encode(h.finalize()))
}
