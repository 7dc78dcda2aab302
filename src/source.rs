//! PVL source engine
//!
//! Resolves the anchor's current kit hash, checks that the anchor
//! observation is fresh enough to rely on, serves the matching kit from the
//! cache, and falls back to a verified network fetch.
//!
//! One lock per engine is held across the anchor check, freshness
//! classification, cache lookup and network fetch. Concurrent callers are
//! deliberately serialized rather than parallelized: kits change rarely and
//! this path is cold most of the time, so one fetch per cold cache beats
//! redundant network traffic. The store write-back after a fetch is the only
//! detached sub-operation; the caller never observes its outcome.
//!
//! Cancellation follows normal async semantics: dropping a caller's future
//! abandons any in-flight collaborator call, and the lock guard releases on
//! every exit path.

use crate::anchor::{AnchorRoot, MerkleAnchor};
use crate::cache::CacheLayer;
use crate::config::PvlConfig;
use crate::error::{PvlResult, PvlSourceError};
use crate::fetch::{self, RemoteFetcher};
use crate::freshness::{Freshness, FreshnessPolicy};
use crate::kit::PvlKit;
use crate::store::PersistentStore;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The way to get the active PVL kit.
///
/// Construct one instance per process and share it; the cache slot lives on
/// the instance, not in any global registry.
pub struct PvlSource {
    anchor: Arc<dyn MerkleAnchor>,
    fetcher: Arc<dyn RemoteFetcher>,
    policy: FreshnessPolicy,
    kit_override: Option<PathBuf>,
    cache: Mutex<CacheLayer>,
}

impl PvlSource {
    /// Create an engine from its collaborators
    pub fn new(
        config: &PvlConfig,
        anchor: Arc<dyn MerkleAnchor>,
        store: Arc<dyn PersistentStore>,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        Self {
            anchor,
            fetcher,
            policy: config.freshness_policy(),
            kit_override: config.kit_override(),
            cache: Mutex::new(CacheLayer::new(store)),
        }
    }

    /// Get the ruleset for one PVL version out of the active kit.
    pub async fn get_pvl(&self, version: i64) -> PvlResult<String> {
        let kit_json = self.get_kit_string().await?;
        let kit = PvlKit::parse(&kit_json)?;
        kit.lookup(version)
    }

    /// Get the active kit document.
    ///
    /// Makes sure the anchor root is recent enough, then serves the kit the
    /// root points at from memory, falling back to the store, falling back
    /// to a verified server fetch.
    pub async fn get_kit_string(&self) -> PvlResult<String> {
        // Operator-trusted file bypasses every check below.
        if let Some(path) = &self.kit_override {
            debug!("using operator kit override: {}", path.display());
            return tokio::fs::read_to_string(path).await.map_err(|e| {
                PvlSourceError::io(format!("reading kit override {}", path.display()), e)
            });
        }

        let mut cache = self.cache.lock().await;

        let root = self.resolve_root().await?;
        if root.pvl_hash.is_empty() {
            return Err(PvlSourceError::NoHash { seqno: root.seqno });
        }
        let hash = root.pvl_hash;

        if let Some(kit_json) = cache.get(&hash).await {
            debug!("using pvl kit hash: {}", hash);
            return Ok(kit_json);
        }

        // Cold path: fetch from the server and verify the digest before the
        // payload touches either cache tier.
        let kit_json = fetch::fetch_verified(self.fetcher.as_ref(), &hash).await?;
        // Fire-and-forget persist; the caller never observes its outcome.
        let _persist = cache.put(&hash, &kit_json);

        debug!("using pvl kit hash: {}", hash);
        Ok(kit_json)
    }

    /// Resolve a usable anchor root, attempting one refresh when the current
    /// observation is missing or no longer fresh. A failed refresh is logged
    /// and the stale-but-not-expired root is used regardless.
    async fn resolve_root(&self) -> PvlResult<AnchorRoot> {
        let mut root = self.anchor.last_root();

        let now = Utc::now();
        let wants_refresh = match &root {
            None => true,
            Some(r) => self.policy.classify(r.fetched_at, now) != Freshness::Fresh,
        };
        if wants_refresh {
            debug!("merkle anchor root should refresh");
            match self.anchor.refresh().await {
                Ok(()) => root = self.anchor.last_root(),
                Err(e) => warn!("could not refresh merkle anchor root: {}", e),
            }
        }

        let root = root.ok_or(PvlSourceError::NoAnchor)?;

        if self.policy.classify(root.fetched_at, Utc::now()) == Freshness::Expired {
            debug!("merkle anchor root too old: seqno {}", root.seqno);
            return Err(PvlSourceError::StaleAnchor {
                seqno: root.seqno,
                fetched_at: root.fetched_at,
            });
        }

        Ok(root)
    }
}
