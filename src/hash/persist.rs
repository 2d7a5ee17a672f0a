//! Persists per-directory manifests to disk.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::digest::{digest, MANIFEST_FILE};
use super::error::HashError;

/// Recursively write each directory's digest to its reserved manifest file,
/// deepest directories first. An existing manifest is renamed to a
/// timestamped `md5.hash.bk.<unixTimestamp>` backup before being overwritten,
/// never silently lost. Backups and the manifest file itself are excluded
/// from hash input, so re-running on an unchanged tree writes identical
/// manifests.
pub fn persist_manifests(root: &Path) -> Result<(), HashError> {
    if !root.is_dir() {
        return Err(HashError::InvalidPathKind {
            path: root.to_path_buf(),
        });
    }

    let read_dir = fs::read_dir(root).map_err(|e| HashError::io(root, "listing", e))?;
    let mut subdirs = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| HashError::io(root, "listing", e))?;
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.sort();
    for dir in &subdirs {
        persist_manifests(dir)?;
    }

    let value = digest(root)?;
    let manifest = root.join(MANIFEST_FILE);
    if manifest.exists() {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let backup = root.join(format!("{}.bk.{}", MANIFEST_FILE, stamp));
        fs::rename(&manifest, &backup).map_err(|e| HashError::io(&manifest, "backing up", e))?;
        debug!(backup = %backup.display(), "backed up existing manifest");
    }
    fs::write(&manifest, &value).map_err(|e| HashError::io(&manifest, "writing", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::digest::is_manifest_backup;

    #[test]
    fn writes_manifest_into_every_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        fs::write(sub.join("b.txt"), b"world").unwrap();

        persist_manifests(dir.path()).unwrap();

        assert!(dir.path().join(MANIFEST_FILE).is_file());
        assert!(sub.join(MANIFEST_FILE).is_file());
    }

    #[test]
    fn rerun_backs_up_and_rewrites_identical_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        persist_manifests(dir.path()).unwrap();
        let first = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();

        persist_manifests(dir.path()).unwrap();
        let second = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();

        assert_eq!(first, second);
        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_manifest_backup(&e.path()))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn fails_on_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let err = persist_manifests(&file).unwrap_err();
        assert!(matches!(err, HashError::InvalidPathKind { .. }));
    }
}
