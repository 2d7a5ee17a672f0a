// Error types for the hashing pass

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while hashing a local tree.
#[derive(Debug, Error)]
pub enum HashError {
    /// The path is neither a regular file nor a directory (broken symlink,
    /// socket, ...). Fatal for the whole hashing pass, never retried.
    #[error("{path} is neither a file nor a directory")]
    InvalidPathKind { path: PathBuf },

    #[error("I/O error while {operation} {path}: {source}")]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl HashError {
    pub(crate) fn io(path: &Path, operation: &'static str, source: io::Error) -> Self {
        HashError::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }
}
