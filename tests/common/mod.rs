// Shared test fixtures: an in-memory spy RemoteStore and a small local tree
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use bucketsync::auth::Identity;
use bucketsync::store::{RemoteEntry, RemoteStore, StoreError};

/// In-memory store recording every put and delete, with optional injected
/// transient failures per key.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    put_failures: Mutex<HashMap<String, u32>>,
    get_failures: Mutex<HashMap<String, u32>>,
    delete_failures: Mutex<HashMap<String, u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Fail the next `times` puts to `path` with a transient error.
    pub fn fail_puts(&self, path: &str, times: u32) {
        self.put_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), times);
    }

    /// Fail the next `times` gets to `path` with a transient error.
    pub fn fail_gets(&self, path: &str, times: u32) {
        self.get_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), times);
    }

    /// Fail the next `times` deletes to `path` with a transient error.
    pub fn fail_deletes(&self, path: &str, times: u32) {
        self.delete_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), times);
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    pub fn puts_of(&self, path: &str) -> usize {
        self.puts.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn deletes_of(&self, path: &str) -> usize {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| *p == path)
            .count()
    }

    fn take_failure(slot: &Mutex<HashMap<String, u32>>, path: &str) -> bool {
        let mut failures = slot.lock().unwrap();
        match failures.get_mut(path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if Self::take_failure(&self.get_failures, path) {
            return Err(StoreError::Transient {
                path: path.to_string(),
                message: "injected get failure".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.puts.lock().unwrap().push(path.to_string());
        if Self::take_failure(&self.put_failures, path) {
            return Err(StoreError::Transient {
                path: path.to_string(),
                message: "injected put failure".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.deletes.lock().unwrap().push(path.to_string());
        if Self::take_failure(&self.delete_failures, path) {
            return Err(StoreError::Transient {
                path: path.to_string(),
                message: "injected delete failure".to_string(),
            });
        }
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| RemoteEntry {
                path: key.clone(),
                size: value.len() as u64,
            })
            .collect())
    }
}

pub fn test_identity() -> Identity {
    Identity {
        sub: "user-1".to_string(),
        name: "Test User".to_string(),
    }
}

/// `root/a.txt` = "hello", `root/sub/b.txt` = "world".
pub fn fixture_tree(base: &Path) -> PathBuf {
    let root = base.join("root");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), b"hello").unwrap();
    fs::write(root.join("sub/b.txt"), b"world").unwrap();
    root
}
