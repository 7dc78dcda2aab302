//! Remote kit retrieval and digest verification
//!
//! The server is asked for a specific hash and the response is re-hashed
//! locally before anything downstream sees it. An unverified payload is
//! never cached and never returned.

use crate::error::{PvlResult, PvlSourceError};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use tracing::{debug, warn};

/// Abstract kit transport
///
/// Implementations retrieve the kit document the server claims matches
/// `hash`. The request is unauthenticated; verification happens in
/// [`fetch_verified`], not in the transport.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Retrieve the kit document for a specific hash
    async fn fetch_kit(&self, hash: &str) -> PvlResult<String>;
}

/// Hex of the SHA-512 digest of a kit document
pub fn kit_digest(document: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(document.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fetch a kit and enforce `digest(payload) == hash`.
///
/// Empty responses are rejected before hashing. A digest mismatch is
/// rejected unconditionally even though the transport succeeded.
pub(crate) async fn fetch_verified(fetcher: &dyn RemoteFetcher, hash: &str) -> PvlResult<String> {
    debug!("fetching pvl kit from server: {}", hash);
    let kit_json = fetcher.fetch_kit(hash).await?;
    if kit_json.is_empty() {
        return Err(PvlSourceError::EmptyPayload);
    }
    let got = kit_digest(&kit_json);
    if got != hash {
        warn!("pvl kit hash mismatch: got {} expected {}", got, hash);
        return Err(PvlSourceError::HashMismatch {
            expected: hash.to_string(),
            got,
        });
    }
    Ok(kit_json)
}

/// Response envelope from the kit endpoint
#[derive(Debug, Deserialize)]
struct KitResponse {
    kit_json: String,
}

/// `RemoteFetcher` over plain HTTP: `GET {endpoint}?hash={hash}`
pub struct HttpFetcher {
    endpoint: String,
}

impl HttpFetcher {
    /// Create a fetcher against the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_kit(&self, hash: &str) -> PvlResult<String> {
        let endpoint = self.endpoint.clone();
        let hash = hash.to_string();
        // ureq is blocking; keep it off the async workers.
        let body = tokio::task::spawn_blocking(move || -> PvlResult<String> {
            let mut response = ureq::get(&endpoint)
                .query("hash", &hash)
                .call()
                .map_err(|e| PvlSourceError::Fetch(e.to_string()))?;
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| PvlSourceError::Fetch(e.to_string()))
        })
        .await
        .map_err(|e| PvlSourceError::Fetch(format!("fetch task failed: {}", e)))??;

        let decoded: KitResponse = serde_json::from_str(&body)?;
        Ok(decoded.kit_json)
    }
}
