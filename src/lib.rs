//! PVL Source - offline proof-validation ruleset delivery
//!
//! Keeps a client's PVL kit (the per-version rulesets used to validate
//! identity proofs offline) anchored to a tamper-evident merkle root and
//! cheap to obtain: an in-memory slot over a persistent store, falling back
//! to a network fetch whose payload is digest-verified before anything
//! trusts or caches it.

pub mod anchor;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod kit;
pub mod source;
pub mod store;

pub use anchor::{AnchorRoot, MerkleAnchor};
pub use config::PvlConfig;
pub use error::{PvlResult, PvlSourceError};
pub use fetch::{HttpFetcher, RemoteFetcher};
pub use kit::PvlKit;
pub use source::PvlSource;
pub use store::{CacheRecord, FileStore, MemoryStore, PersistentStore};
