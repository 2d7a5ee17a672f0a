// Object-store boundary consumed by the sync engines
// Authentication and byte transfer live behind implementations

pub mod opendal;

use async_trait::async_trait;
use thiserror::Error;

pub use self::opendal::OpendalStore;

/// One object under a listed prefix.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    /// Full object key.
    pub path: String,
    pub size: u64,
}

/// Store failures, split into the classes the retry policy cares about.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Benign "absent" sentinel. Callers convert this into empty/default
    /// values at the manifest, lock and log lookups.
    #[error("remote object not found: {0}")]
    NotFound(String),

    /// Worth retrying: timeouts, throttling, connection resets.
    #[error("transient store failure on {path}: {message}")]
    Transient { path: String, message: String },

    /// Not worth retrying: permissions, bad requests, misconfiguration.
    #[error("store failure on {path}: {message}")]
    Permanent { path: String, message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Transient { .. })
    }
}

/// Minimal object-store contract: byte-level get/put/delete plus a recursive
/// prefix listing.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch an object's bytes. Fails with `StoreError::NotFound` if absent.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Write an object, replacing any prior content.
    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), StoreError>;

    /// Delete an object.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// List every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteEntry>, StoreError>;
}
