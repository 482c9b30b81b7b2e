//! Hash-gated atomic file replacement.
//!
//! 1. SHA-256 the new content.
//! 2. Compare with the digest of the file on disk; skip if identical.
//! 3. Write `<path>.docpatch.tmp`.
//! 4. Rename over the final path (atomic on POSIX).
//!
//! Staging artifacts and local collection files are only ever written
//! through here, never patched in place.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Outcome of a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Content changed or the file did not previously exist.
    Written { path: PathBuf },
    /// Content on disk already matches.
    Unchanged { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path } | WriteResult::Unchanged { path } => path,
        }
    }
}

/// Replace `path` with `content`, creating parent directories.
///
/// Errors carry no path; callers attach the one they care about.
pub fn atomic_write(path: &Path, content: &str) -> std::io::Result<WriteResult> {
    let tmp = PathBuf::from(format!("{}.docpatch.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> std::io::Result<WriteResult> {
    if let Ok(existing) = std::fs::read(path) {
        if digest(&existing) == digest(content.as_bytes()) {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(tmp, content)?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(e);
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().into()
}
