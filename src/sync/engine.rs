//! Depth-first locked sync of a local tree against a remote prefix.
//!
//! Subdirectories complete their entire sync (including their own locking)
//! before the parent's manifest comparison runs. A directory whose manifest
//! matches the remote copy is skipped without acquiring a lock or issuing
//! any remote write.

use std::path::{Component, Path};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error, info};

use super::error::SyncError;
use super::join_key;
use super::lock::SyncLock;
use super::upload::{RetryPolicy, SyncTask, UploadEngine};
use crate::auth::Identity;
use crate::hash::{is_manifest_backup, HashError, MANIFEST_FILE};
use crate::store::{RemoteStore, StoreError};

/// Options for one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upload regardless of manifest state and overwrite an existing lock.
    pub force: bool,
    /// Worker count for each per-directory upload batch.
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Identity attributed to lock and log records.
    pub identity: Identity,
}

impl SyncOptions {
    pub fn new(identity: Identity) -> Self {
        Self {
            force: false,
            workers: num_cpus::get(),
            retry: RetryPolicy::default(),
            identity,
        }
    }
}

/// Join a remote prefix with a relative local path, '/'-separated regardless
/// of the local platform. A `"."` prefix means the store root.
fn remote_join(prefix: &str, rel: &Path) -> String {
    let mut out = match prefix.trim_end_matches('/') {
        "." | "" => String::new(),
        p => p.to_string(),
    };
    for component in rel.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

/// Relative path of `local` under `base`. A `"."` or empty base means the
/// current directory: the path is kept as addressed, so a bare relative path
/// like `root` syncs as `root` without needing a `./` spelling.
fn relative_to<'a>(local: &'a Path, base: &Path) -> Result<&'a Path, SyncError> {
    if let Ok(rel) = local.strip_prefix(base) {
        return Ok(rel);
    }
    if base.as_os_str() == "." || base.as_os_str().is_empty() {
        return Ok(local);
    }
    Err(SyncError::OutsideBase {
        path: local.to_path_buf(),
        base: base.to_path_buf(),
    })
}

/// Sync `local` (a file or a directory tree) under `prefix` on the store.
/// Remote keys are `prefix / relative(local, base)`, so `base` must be an
/// ancestor of `local` or `local` itself.
pub async fn sync_up(
    store: &dyn RemoteStore,
    local: &Path,
    prefix: &str,
    base: &Path,
    opts: &SyncOptions,
) -> Result<(), SyncError> {
    sync_path(store, local, prefix, base, opts).await
}

fn sync_path<'a>(
    store: &'a dyn RemoteStore,
    local: &'a Path,
    prefix: &'a str,
    base: &'a Path,
    opts: &'a SyncOptions,
) -> BoxFuture<'a, Result<(), SyncError>> {
    async move {
        let rel = relative_to(local, base)?;

        if local.is_file() {
            // Single file: direct upload, no hashing, no locking.
            let remote = remote_join(prefix, rel);
            let engine = UploadEngine::new(1).with_retry(opts.retry.clone());
            return engine
                .run(
                    store,
                    vec![SyncTask {
                        local: local.to_path_buf(),
                        remote,
                    }],
                )
                .await;
        }
        if !local.is_dir() {
            return Err(HashError::InvalidPathKind {
                path: local.to_path_buf(),
            }
            .into());
        }

        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        let read_dir = std::fs::read_dir(local).map_err(|e| SyncError::Io {
            path: local.to_path_buf(),
            source: e,
        })?;
        for entry in read_dir {
            let entry = entry.map_err(|e| SyncError::Io {
                path: local.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_dir() {
                subdirs.push(path);
            } else if path.is_file() && !is_manifest_backup(&path) {
                files.push(path);
            }
        }
        subdirs.sort();
        files.sort();

        // Subtrees first, so they finish before this level's own upload work.
        for dir in &subdirs {
            sync_path(store, dir, prefix, base, opts).await?;
        }

        let remote_dir = remote_join(prefix, rel);
        if !opts.force && manifest_matches(store, local, &remote_dir).await? {
            info!(local = %local.display(), "manifest match, skipping");
            return Ok(());
        }

        let tasks: Vec<SyncTask> = files
            .iter()
            .filter_map(|file| {
                file.file_name().map(|name| SyncTask {
                    local: file.clone(),
                    remote: join_key(&remote_dir, &name.to_string_lossy()),
                })
            })
            .collect();

        info!(local = %local.display(), remote = %remote_dir, files = tasks.len(), "uploading directory");

        let mut handle = SyncLock::acquire(store, &remote_dir, &opts.identity, opts.force).await?;
        let engine = UploadEngine::new(opts.workers).with_retry(opts.retry.clone());
        let work = engine.run(store, tasks).await;
        if let Err(ref e) = work {
            handle.append(&format!("sync error: {}", e));
        }
        let released = SyncLock::release(store, handle).await;

        match (work, released) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(work_err), Ok(())) => Err(work_err),
            (Ok(()), Err(release_err)) => Err(release_err),
            (Err(work_err), Err(release_err)) => {
                // The release failure must not mask the original error.
                error!(error = %release_err, "lock release failed during error teardown");
                Err(work_err)
            }
        }
    }
    .boxed()
}

/// Byte-for-byte comparison of the local manifest file against the remote
/// copy. Absent on either side means "no match".
async fn manifest_matches(
    store: &dyn RemoteStore,
    local: &Path,
    remote_dir: &str,
) -> Result<bool, SyncError> {
    let local_manifest = local.join(MANIFEST_FILE);
    if !local_manifest.is_file() {
        info!(local = %local.display(), "not hashed locally, uploading without hash check");
        return Ok(false);
    }
    let local_bytes = std::fs::read(&local_manifest).map_err(|e| SyncError::Io {
        path: local_manifest.clone(),
        source: e,
    })?;

    let remote_path = join_key(remote_dir, MANIFEST_FILE);
    match store.get(&remote_path).await {
        Ok(remote_bytes) => Ok(remote_bytes == local_bytes),
        Err(StoreError::NotFound(_)) => {
            debug!(remote = %remote_path, "remote manifest absent, uploading");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
