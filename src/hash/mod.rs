// Hashing module
// Content digests and per-directory manifests for change detection

pub mod digest;
pub mod error;
pub mod persist;

pub use digest::{
    digest, digest_bytes, digest_filtered, is_manifest_artifact, is_manifest_backup,
    manifest_text, MANIFEST_BACKUP_PREFIX, MANIFEST_FILE,
};
pub use error::HashError;
pub use persist::persist_manifests;
