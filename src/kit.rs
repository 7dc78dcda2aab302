//! PVL kit envelope parsing
//!
//! A kit is a JSON envelope holding one ruleset per supported PVL version:
//! `{"kit_version": .., "ctime": .., "tab": {"1": <ruleset>, ..}}`.
//! The parsed form is ephemeral; only the raw kit string is ever cached.

use crate::error::{PvlResult, PvlSourceError};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::HashMap;

/// Parsed PVL kit envelope
#[derive(Debug, Deserialize)]
pub struct PvlKit {
    /// Format version of the kit envelope itself
    pub kit_version: i64,

    /// Server-side creation time, unix seconds
    pub ctime: i64,

    /// Ruleset per PVL version, kept as raw JSON
    #[serde(default)]
    pub tab: HashMap<i64, Box<RawValue>>,
}

impl PvlKit {
    /// Parse a kit document. Any structural failure aborts the whole parse;
    /// there is no partial result.
    pub fn parse(kit_json: &str) -> PvlResult<Self> {
        serde_json::from_str(kit_json).map_err(|source| PvlSourceError::MalformedKit { source })
    }

    /// Look up the ruleset for one PVL version.
    ///
    /// A missing table entry is `MissingVersion`; an entry that is present
    /// but carries nothing (JSON `null` or `""`) is `EmptyVersion`.
    pub fn lookup(&self, version: i64) -> PvlResult<String> {
        let raw = self
            .tab
            .get(&version)
            .ok_or(PvlSourceError::MissingVersion(version))?;
        let text = raw.get();
        if text.is_empty() || text == "null" || text == "\"\"" {
            return Err(PvlSourceError::EmptyVersion(version));
        }
        Ok(text.to_string())
    }
}
