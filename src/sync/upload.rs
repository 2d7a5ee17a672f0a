//! Bounded, retrying upload pool.

use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::error::SyncError;
use crate::store::{RemoteStore, StoreError};

/// One file transfer unit: local source, remote destination key.
#[derive(Debug, Clone)]
pub struct SyncTask {
    pub local: PathBuf,
    pub remote: String,
}

/// Retry policy for transient store failures: exponential backoff with a
/// terminal error on exhaustion. The legacy behavior here was an unbounded
/// in-place retry that could hang a sync forever; failing loudly after a
/// bounded number of attempts replaces it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Uploads a batch of tasks with at most `workers` puts in flight.
pub struct UploadEngine {
    workers: usize,
    retry: RetryPolicy,
    put_timeout: Duration,
}

impl UploadEngine {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            retry: RetryPolicy::default(),
            put_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_put_timeout(mut self, put_timeout: Duration) -> Self {
        self.put_timeout = put_timeout;
        self
    }

    /// Upload every task. The first task that gives up fails the batch.
    pub async fn run(&self, store: &dyn RemoteStore, tasks: Vec<SyncTask>) -> Result<(), SyncError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let bar = ProgressBar::new(tasks.len() as u64);
        stream::iter(tasks)
            .map(Ok::<SyncTask, SyncError>)
            .try_for_each_concurrent(self.workers, |task| {
                let bar = bar.clone();
                async move {
                    self.upload_one(store, task).await?;
                    bar.inc(1);
                    Ok(())
                }
            })
            .await?;
        bar.finish_and_clear();
        Ok(())
    }

    /// Upload one file, resubmitting the same put on transient failure. A
    /// timed-out put counts as transient; permanent store errors fail
    /// immediately.
    async fn upload_one(&self, store: &dyn RemoteStore, task: SyncTask) -> Result<(), SyncError> {
        let data = tokio::fs::read(&task.local).await.map_err(|e| SyncError::Io {
            path: task.local.clone(),
            source: e,
        })?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = match timeout(self.put_timeout, store.put(&task.remote, data.clone())).await
            {
                Ok(result) => result,
                Err(_) => Err(StoreError::Transient {
                    path: task.remote.clone(),
                    message: format!("put timed out after {:?}", self.put_timeout),
                }),
            };

            match result {
                Ok(()) => {
                    debug!(remote = %task.remote, attempt, "uploaded");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(remote = %task.remote, attempt, error = %e, "upload failed, retrying in {:?}", delay);
                    sleep(delay).await;
                }
                Err(e) => {
                    return Err(SyncError::UploadFailed {
                        remote_path: task.remote,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
