//! Merkle anchor seam
//!
//! The engine never talks to the tamper-evident log directly; it reads the
//! most recently observed root from a [`MerkleAnchor`] collaborator and asks
//! it to refresh when that observation is getting old.

use crate::error::PvlResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Snapshot of a merkle root observation.
///
/// `fetched_at` is when this client observed the root, not when the server
/// published it, so a slow publisher does not invalidate a recent
/// observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRoot {
    /// Hex digest of the currently valid PVL kit. May be empty if the
    /// anchor carries no kit pointer.
    pub pvl_hash: String,

    /// Local observation time of this root.
    pub fetched_at: DateTime<Utc>,

    /// Sequence number in the append-only log, for diagnostics.
    pub seqno: u64,
}

/// Abstract merkle anchor client
///
/// Implemented by the host application over whatever log transport it uses.
#[async_trait]
pub trait MerkleAnchor: Send + Sync {
    /// The most recently observed root, if any has been observed.
    fn last_root(&self) -> Option<AnchorRoot>;

    /// Ask the anchor client to fetch a newer root. Best-effort: the engine
    /// logs a failure and keeps going with whatever `last_root` returns.
    async fn refresh(&self) -> PvlResult<()>;
}
