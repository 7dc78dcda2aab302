//! Anchor freshness classification
//!
//! Ages are measured from when the root was fetched locally, not when it was
//! published, so the engine keeps working through server-side publishing gaps.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Anchor age below this needs no refresh.
pub const DEFAULT_SHOULD_REFRESH: Duration = Duration::from_secs(60 * 60);

/// Anchor age at or beyond this is unusable. All verification fails.
pub const DEFAULT_REQUIRE_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

/// How usable an anchor observation is, by age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Recent enough to use as-is
    Fresh,
    /// Old enough to warrant a refresh attempt, still usable if it fails
    Staleable,
    /// Too old to trust, even after a refresh attempt
    Expired,
}

/// Classifies anchor observations into freshness bands
#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    should_refresh: Duration,
    require_refresh: Duration,
}

impl FreshnessPolicy {
    /// Create a policy with explicit thresholds
    pub fn new(should_refresh: Duration, require_refresh: Duration) -> Self {
        Self {
            should_refresh,
            require_refresh,
        }
    }

    /// Classify an observation made at `fetched_at`, as seen from `now`.
    ///
    /// A `fetched_at` in the future (clock skew) counts as age zero.
    pub fn classify(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
        let age = (now - fetched_at).to_std().unwrap_or(Duration::ZERO);
        if age < self.should_refresh {
            Freshness::Fresh
        } else if age < self.require_refresh {
            Freshness::Staleable
        } else {
            Freshness::Expired
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SHOULD_REFRESH, DEFAULT_REQUIRE_REFRESH)
    }
}
