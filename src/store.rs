//! Persistent cache store seam and implementations
//!
//! The engine persists at most one record, at a single fixed key. Any store
//! write is a complete hash-identified blob, so last-writer-wins is safe.

use crate::error::{PvlResult, PvlSourceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;

/// The single logical key this cache uses.
pub const ACTIVE_KEY: &str = "active";

/// Bump this to ignore existing cache entries.
pub const RECORD_FORMAT_VERSION: u32 = 1;

/// Persisted cache record: the kit document plus the hash it was verified
/// against and the record format it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Record format at write time
    pub format_version: u32,

    /// Hex digest the payload was verified against
    pub hash: String,

    /// The raw kit document
    pub kit_json: String,
}

impl CacheRecord {
    /// Create a record in the current format
    pub fn new(hash: impl Into<String>, kit_json: impl Into<String>) -> Self {
        Self {
            format_version: RECORD_FORMAT_VERSION,
            hash: hash.into(),
            kit_json: kit_json.into(),
        }
    }

    /// Whether this record was written in the format the engine expects.
    /// Stale formats read as cache misses, never as errors.
    pub fn is_current(&self) -> bool {
        self.format_version == RECORD_FORMAT_VERSION
    }
}

/// Abstract durable key-value store
///
/// Implemented by the host application over its storage engine, or use
/// [`FileStore`] / [`MemoryStore`] from this crate.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Read the record at `key`. `Ok(None)` when nothing is stored there.
    async fn get(&self, key: &str) -> PvlResult<Option<CacheRecord>>;

    /// Write the record at `key`, replacing whatever was there.
    async fn put(&self, key: &str, record: &CacheRecord) -> PvlResult<()>;
}

/// `PersistentStore` backed by one JSON file per key
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default store directory under the platform state dir
    pub fn default_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pvl-source")
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn get(&self, key: &str) -> PvlResult<Option<CacheRecord>> {
        let path = self.record_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PvlSourceError::store(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let record = serde_json::from_str(&content).map_err(|e| {
            PvlSourceError::store(format!("decoding {}: {}", path.display(), e))
        })?;
        Ok(Some(record))
    }

    async fn put(&self, key: &str, record: &CacheRecord) -> PvlResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PvlSourceError::store(format!("creating {}: {}", self.dir.display(), e)))?;
        let path = self.record_path(key);
        let content = serde_json::to_string(record)?;
        fs::write(&path, content)
            .await
            .map_err(|e| PvlSourceError::store(format!("writing {}: {}", path.display(), e)))
    }
}

/// In-memory `PersistentStore`, for embedding and tests
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CacheRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> PvlResult<Option<CacheRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| PvlSourceError::store("memory store poisoned"))?;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, key: &str, record: &CacheRecord) -> PvlResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| PvlSourceError::store("memory store poisoned"))?;
        records.insert(key.to_string(), record.clone());
        Ok(())
    }
}
