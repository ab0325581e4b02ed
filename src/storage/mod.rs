use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{ Mutex, RwLock };

use crate::error::{ AppError, Result };

/// Key-value persistence boundary.
///
/// Every durable piece of engine state (user configs, spend counters, swap
/// history) lives behind this trait keyed by wallet-scoped string keys. A
/// `put` replaces the whole value for a key in one step, so callers get
/// atomic read-modify-write by validating first and writing once.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Single-file JSON store. Writes go to a temp file first and are renamed
/// into place so a crash mid-write cannot corrupt the stored state.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub async fn open(path: PathBuf) -> Result<Self> {
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) =>
                serde_json
                    ::from_str(&raw)
                    .map_err(|e| AppError::Storage(format!("Corrupt store file: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AppError::Storage(format!("Failed to read store file: {}", e)));
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json
            ::to_string_pretty(entries)
            .map_err(|e| AppError::Storage(format!("Failed to serialize store: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs
            ::write(&tmp, raw).await
            .map_err(|e| AppError::Storage(format!("Failed to write store file: {}", e)))?;
        tokio::fs
            ::rename(&tmp, &self.path).await
            .map_err(|e| AppError::Storage(format!("Failed to replace store file: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        self.persist(&entries).await
    }
}

/// Build the store selected by configuration.
pub async fn open_store(path: Option<PathBuf>) -> Result<Arc<dyn KvStore>> {
    match path {
        Some(path) => Ok(Arc::new(FileStore::open(path).await?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
