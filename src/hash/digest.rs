//! Content digests for files and directories.
//!
//! A file digests to the MD5 of its bytes. A directory digests to the MD5 of
//! its manifest text: one `"path\tdigest"` line per immediate child, children
//! processed in name-sorted order so the result does not depend on filesystem
//! iteration order. A subdirectory contributes the digest of its own manifest
//! text, not of its raw contents.

use md5::{Digest, Md5};
use std::fs;
use std::path::Path;

use super::error::HashError;

/// Reserved per-directory manifest filename. Always excluded from its own
/// directory's hash input.
pub const MANIFEST_FILE: &str = "md5.hash";

/// Prefix of timestamped manifest backups (`md5.hash.bk.<unixTimestamp>`).
pub const MANIFEST_BACKUP_PREFIX: &str = "md5.hash.bk.";

/// True for timestamped manifest backups. These are never hashed and never
/// uploaded as data.
pub fn is_manifest_backup(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(name) if name.starts_with(MANIFEST_BACKUP_PREFIX)
    )
}

/// True for the reserved manifest file and its backups.
pub fn is_manifest_artifact(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(name) if name == MANIFEST_FILE || name.starts_with(MANIFEST_BACKUP_PREFIX)
    )
}

/// Hex MD5 of a byte slice.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Content digest of a file, or the digest of a directory's manifest text.
///
/// `skip` filters children out of a directory's hash input; it is how the
/// reserved manifest file is kept from influencing its own digest.
pub fn digest_filtered(path: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<String, HashError> {
    if path.is_file() {
        let data = fs::read(path).map_err(|e| HashError::io(path, "reading", e))?;
        return Ok(digest_bytes(&data));
    }
    if path.is_dir() {
        let text = manifest_text(path, skip)?;
        return Ok(digest_bytes(text.as_bytes()));
    }
    Err(HashError::InvalidPathKind {
        path: path.to_path_buf(),
    })
}

/// Digest with the default exclusion of manifest artifacts.
pub fn digest(path: &Path) -> Result<String, HashError> {
    digest_filtered(path, &is_manifest_artifact)
}

/// Manifest text for a directory's immediate children: newline-separated
/// `"path\tdigest"` records in name-sorted order.
///
/// Records embed the child path exactly as the directory was addressed, so
/// digests of the same tree are only comparable when it is hashed via the
/// same addressing path (`./root` and an absolute spelling of the same
/// directory produce different manifests).
pub fn manifest_text(dir: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<String, HashError> {
    let read_dir = fs::read_dir(dir).map_err(|e| HashError::io(dir, "listing", e))?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| HashError::io(dir, "listing", e))?;
        names.push(entry.file_name());
    }
    // The record order influences the digest; it must be stable.
    names.sort();

    let mut text = String::new();
    for name in names {
        let child = dir.join(&name);
        if skip(&child) {
            continue;
        }
        let child_digest = digest_filtered(&child, skip)?;
        text.push_str(&format!("{}\t{}\n", child.display(), child_digest));
    }
    Ok(text)
}
