//! Locked, incremental sync between a local tree and a remote prefix.

pub mod download;
pub mod engine;
pub mod error;
pub mod lock;
pub mod upload;

pub use download::sync_down;
pub use engine::{sync_up, SyncOptions};
pub use error::SyncError;
pub use lock::{LogHandle, SyncLock, LOCK_FILE, LOG_FILE};
pub use upload::{RetryPolicy, SyncTask, UploadEngine};

/// Join remote key segments without doubling separators.
pub(crate) fn join_key(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}
