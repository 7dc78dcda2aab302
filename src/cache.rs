//! Two-tier hash-addressed kit cache
//!
//! One in-memory slot holding the most recently verified record, over one
//! fixed-key record in the persistent store. Cache hits are trusted without
//! re-hashing: the digest was verified when the entry was written, so
//! matching the anchor to a cached entry is a plain string comparison.
//! There is no eviction; both tiers are simply overwritten.

use crate::error::PvlResult;
use crate::store::{CacheRecord, PersistentStore, ACTIVE_KEY};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Memory slot plus persistent tier. Callers must serialize access; the
/// engine keeps this behind its orchestration lock.
pub struct CacheLayer {
    mem: Option<CacheRecord>,
    store: Arc<dyn PersistentStore>,
}

impl CacheLayer {
    /// Create an empty cache over the given store
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { mem: None, store }
    }

    /// Look up the kit for `hash`: memory slot first, then the store.
    ///
    /// A store hit populates the memory slot. Store errors and records in a
    /// stale format degrade to a miss; a miss is never an error.
    pub async fn get(&mut self, hash: &str) -> Option<String> {
        if let Some(record) = &self.mem {
            if record.hash == hash {
                debug!("pvl kit mem cache hit");
                return Some(record.kit_json.clone());
            }
        }

        let record = match self.store.get(ACTIVE_KEY).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!("error reading pvl kit from store: {}", e);
                return None;
            }
        };
        if !record.is_current() || record.hash != hash {
            return None;
        }

        debug!("pvl kit store cache hit");
        self.mem = Some(record.clone());
        Some(record.kit_json)
    }

    /// Record a freshly verified kit.
    ///
    /// The memory slot is replaced immediately, under the caller's lock. The
    /// store write runs as a detached task so durable I/O never blocks the
    /// caller; its failure is logged only, since correctness is re-established
    /// by re-fetch-and-verify rather than by cache reliability.
    pub fn put(&mut self, hash: &str, kit_json: &str) -> JoinHandle<()> {
        let record = CacheRecord::new(hash, kit_json);
        self.mem = Some(record.clone());

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = persist(store.as_ref(), &record).await {
                error!("storing pvl kit: {}", e);
            }
        })
    }

    #[cfg(test)]
    fn mem_hash(&self) -> Option<&str> {
        self.mem.as_ref().map(|record| record.hash.as_str())
    }
}

async fn persist(store: &dyn PersistentStore, record: &CacheRecord) -> PvlResult<()> {
    store.put(ACTIVE_KEY, record).await
}
