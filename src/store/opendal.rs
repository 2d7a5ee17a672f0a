//! S3 and GCS backed `RemoteStore` using OpenDAL.

use anyhow::Result;
use async_trait::async_trait;
use opendal::services::{Gcs, S3};
use opendal::{ErrorKind, Operator};

use super::{RemoteEntry, RemoteStore, StoreError};

/// Object store backed by an OpenDAL operator.
pub struct OpendalStore {
    operator: Operator,
}

impl OpendalStore {
    /// S3 or S3-compatible store. Credentials come from the standard AWS
    /// credential chain; a custom endpoint selects a compatible provider.
    pub fn s3(bucket: &str, region: &str, endpoint: Option<&str>) -> Result<Self> {
        let mut builder = S3::default().bucket(bucket).region(region);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }
        let operator = Operator::new(builder)?.finish();
        Ok(Self { operator })
    }

    /// Google Cloud Storage bucket, credentials auto-detected.
    pub fn gcs(bucket: &str) -> Result<Self> {
        let builder = Gcs::default().bucket(bucket);
        let operator = Operator::new(builder)?.finish();
        Ok(Self { operator })
    }
}

fn map_err(path: &str, err: opendal::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else if err.is_temporary() {
        StoreError::Transient {
            path: path.to_string(),
            message: err.to_string(),
        }
    } else {
        StoreError::Permanent {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl RemoteStore for OpendalStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let content = self
            .operator
            .read(path)
            .await
            .map_err(|e| map_err(path, e))?;
        Ok(content.to_vec())
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.operator
            .write(path, data)
            .await
            .map_err(|e| map_err(path, e))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.operator
            .delete(path)
            .await
            .map_err(|e| map_err(path, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        let entries = self
            .operator
            .list_with(prefix)
            .recursive(true)
            .await
            .map_err(|e| map_err(prefix, e))?;

        let mut result = Vec::new();
        for entry in entries {
            let meta = entry.metadata();
            if meta.mode().is_dir() {
                continue;
            }
            result.push(RemoteEntry {
                path: entry.path().to_string(),
                size: meta.content_length(),
            });
        }
        Ok(result)
    }
}
