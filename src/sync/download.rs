//! Mirror a remote prefix into a local directory.

use std::path::Path;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{info, warn};

use super::error::SyncError;
use crate::store::{RemoteEntry, RemoteStore};

/// Fetch every object under `prefix` into `local`, creating parent
/// directories as needed and overwriting existing files. A `"."` prefix
/// means the store root, as in the upload direction. No hashing, no
/// locking, no manifest comparison. Each entry gets exactly one attempt;
/// failures are logged and fail the batch after every entry has been tried.
pub async fn sync_down(
    store: &dyn RemoteStore,
    local: &Path,
    prefix: &str,
    workers: usize,
) -> Result<(), SyncError> {
    let prefix = if prefix == "." { "" } else { prefix };
    let entries = store.list(prefix).await?;
    let total = entries.len();
    info!(prefix, total, "downloading");

    let bar = ProgressBar::new(total as u64);
    let failed = stream::iter(entries)
        .map(|entry| {
            let bar = bar.clone();
            async move {
                let result = fetch_one(store, local, prefix, &entry).await;
                if let Err(ref e) = result {
                    warn!(remote = %entry.path, error = %e, "download failed");
                }
                bar.inc(1);
                result.is_err()
            }
        })
        .buffer_unordered(workers.max(1))
        .filter(|failed| futures::future::ready(*failed))
        .count()
        .await;
    bar.finish_and_clear();

    if failed > 0 {
        return Err(SyncError::DownloadFailed { failed, total });
    }
    Ok(())
}

async fn fetch_one(
    store: &dyn RemoteStore,
    local: &Path,
    prefix: &str,
    entry: &RemoteEntry,
) -> Result<(), SyncError> {
    let rel = entry
        .path
        .strip_prefix(prefix)
        .unwrap_or(&entry.path)
        .trim_start_matches('/');
    let dest = local.join(rel);

    let data = store.get(&entry.path).await?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    tokio::fs::write(&dest, data)
        .await
        .map_err(|e| SyncError::Io {
            path: dest.clone(),
            source: e,
        })?;
    Ok(())
}
