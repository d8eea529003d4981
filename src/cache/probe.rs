//! Local cache lookup
//!
//! A probe reports one of three states for a key. Absent means fetch;
//! Valid and Stale both mean the warmer leaves the entry alone.

use crate::cache::key::CacheKey;
use crate::cache::writer::ManifestRecord;
use crate::config::CacheOptions;
use crate::error::WarmResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a local cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// No usable entry
    Absent,
    /// Entry exists and is within its TTL
    Valid,
    /// Entry exists but has outlived its TTL
    Stale,
}

impl CacheState {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Valid => "valid",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Result of a probe; present entries carry their manifest record
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Absent,
    Valid(ManifestRecord),
    Stale(ManifestRecord),
}

impl ProbeOutcome {
    pub fn state(&self) -> CacheState {
        match self {
            Self::Absent => CacheState::Absent,
            Self::Valid(_) => CacheState::Valid,
            Self::Stale(_) => CacheState::Stale,
        }
    }

    /// The cached record, if an entry exists
    pub fn record(&self) -> Option<&ManifestRecord> {
        match self {
            Self::Absent => None,
            Self::Valid(record) | Self::Stale(record) => Some(record),
        }
    }
}

/// Looks up a cache entry by key.
///
/// Errors are reserved for failures of the lookup itself (unreadable store,
/// corrupt record); a missing or expired entry is an outcome, not an error.
#[async_trait]
pub trait LocalLookup: Send + Sync {
    async fn probe(&self, opts: &CacheOptions, key: &CacheKey) -> WarmResult<ProbeOutcome>;
}
