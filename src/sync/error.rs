// Error types for sync operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::hash::HashError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The target is already locked by another writer and `force` was off.
    /// Raised before any remote mutation.
    #[error("{remote_dir} is locked. {content:?} Pass force to overwrite.")]
    Locked { remote_dir: String, content: String },

    /// An upload gave up: retries exhausted on a transient failure, or the
    /// store reported a permanent one.
    #[error("upload of {remote_path} failed after {attempts} attempt(s): {source}")]
    UploadFailed {
        remote_path: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// Downloads are attempted once each; the batch fails after every entry
    /// has had its attempt.
    #[error("{failed} of {total} downloads failed")]
    DownloadFailed { failed: usize, total: usize },

    #[error("{path} is not under the sync base {base}")]
    OutsideBase { path: PathBuf, base: PathBuf },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
