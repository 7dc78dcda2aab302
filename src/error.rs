//! Error types for the PVL source engine
//!
//! All modules use `PvlResult<T>` as their return type.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for PVL source operations
pub type PvlResult<T> = Result<T, PvlSourceError>;

/// All errors that can surface from the PVL source engine
#[derive(Error, Debug)]
pub enum PvlSourceError {
    // Anchor errors
    #[error("no merkle anchor root available")]
    NoAnchor,

    #[error("merkle anchor root too old: seqno {seqno}, fetched {fetched_at}")]
    StaleAnchor {
        seqno: u64,
        fetched_at: DateTime<Utc>,
    },

    #[error("merkle anchor root has empty pvl hash: seqno {seqno}")]
    NoHash { seqno: u64 },

    // Fetch and verification errors
    #[error("fetched pvl kit digest mismatch: expected {expected}, got {got}")]
    HashMismatch { expected: String, got: String },

    #[error("server returned an empty pvl kit")]
    EmptyPayload,

    #[error("fetching pvl kit: {0}")]
    Fetch(String),

    // Kit errors
    #[error("unmarshalling pvl kit: {source}")]
    MalformedKit {
        #[source]
        source: serde_json::Error,
    },

    #[error("missing pvl for version {0}")]
    MissingVersion(i64),

    #[error("empty pvl for version {0}")]
    EmptyVersion(i64),

    // Store errors
    #[error("persistent store unavailable: {context}")]
    StoreUnavailable { context: String },

    // Configuration errors
    #[error("invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl PvlSourceError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store error with context
    pub fn store(context: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            context: context.into(),
        }
    }

    /// Whether the engine may swallow this error and fall through to
    /// another path (log-only degradation). Everything else propagates.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}
