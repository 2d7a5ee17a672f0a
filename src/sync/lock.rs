//! Advisory lock marker and operation log kept on the store itself.
//!
//! The `.lock` check and the subsequent write are not atomic against the
//! store, so two concurrent callers can both pass the check. Best-effort
//! mutual exclusion only, not a linearizable lock.

use chrono::Local;
use tracing::debug;

use super::error::SyncError;
use super::join_key;
use crate::auth::Identity;
use crate::store::{RemoteStore, StoreError};

/// Lock marker filename inside a synced remote directory.
pub const LOCK_FILE: &str = ".lock";

/// Operation log filename, newest record first.
pub const LOG_FILE: &str = "sync.log";

fn record(identity: &Identity, op: &str) -> String {
    format!(
        "{}/{}: {}: {}",
        identity.name,
        identity.sub,
        Local::now().format("%c"),
        op
    )
}

/// Operation log accumulated over one locked sync scope. Returned by
/// [`SyncLock::acquire`], consumed by [`SyncLock::release`].
pub struct LogHandle {
    remote_dir: String,
    identity: Identity,
    log: String,
}

impl LogHandle {
    /// Prepend a timestamped record.
    pub fn append(&mut self, op: &str) {
        self.log = format!("{}\n{}", record(&self.identity, op), self.log);
    }
}

pub struct SyncLock;

impl SyncLock {
    /// Acquire the advisory lock on `remote_dir` and load its operation log.
    ///
    /// Fails with [`SyncError::Locked`] if a marker already exists and
    /// `force` is off, without mutating any remote state. With `force`, a
    /// stale marker is overwritten.
    pub async fn acquire(
        store: &dyn RemoteStore,
        remote_dir: &str,
        identity: &Identity,
        force: bool,
    ) -> Result<LogHandle, SyncError> {
        let lock_path = join_key(remote_dir, LOCK_FILE);
        match store.get(&lock_path).await {
            Ok(content) => {
                if !force {
                    return Err(SyncError::Locked {
                        remote_dir: remote_dir.to_string(),
                        content: String::from_utf8_lossy(&content).into_owned(),
                    });
                }
                debug!(remote_dir, "overwriting existing lock (force)");
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        store
            .put(&lock_path, record(identity, "lock").into_bytes())
            .await?;

        let log_path = join_key(remote_dir, LOG_FILE);
        let log = match store.get(&log_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(StoreError::NotFound(_)) => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut handle = LogHandle {
            remote_dir: remote_dir.to_string(),
            identity: identity.clone(),
            log,
        };
        handle.append("start sync");
        Ok(handle)
    }

    /// Delete the marker and write the accumulated log back. Must run on
    /// every scope exit; a failure here is surfaced, not swallowed.
    pub async fn release(store: &dyn RemoteStore, mut handle: LogHandle) -> Result<(), SyncError> {
        let lock_path = join_key(&handle.remote_dir, LOCK_FILE);
        store.delete(&lock_path).await?;

        handle.append("end sync");
        let log_path = join_key(&handle.remote_dir, LOG_FILE);
        store.put(&log_path, handle.log.into_bytes()).await?;
        Ok(())
    }
}
