//! Local base-image cache
//!
//! Entries are keyed by a hash of image reference and platform and live in
//! a flat directory as an archive plus a manifest record.
//!
//! # Cache States
//!
//! | State | Warm does | Description |
//! |-------|-----------|-------------|
//! | Absent | fetch + write | No entry, or an archive without its manifest |
//! | Valid | nothing | Entry within its TTL |
//! | Stale | nothing | Entry past its TTL, still reported as cached |

pub mod batch;
pub mod key;
pub mod probe;
pub mod store;
pub mod warmer;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{warm_all, warm_stream, warm_to_store, WarmReport};
pub use key::CacheKey;
pub use probe::{CacheState, LocalLookup, ProbeOutcome};
pub use store::{is_expired, FsCacheStore, PendingCommit, StagedEntry};
pub use warmer::{Warmed, Warmer};
pub use writer::{build_archive, build_manifest, write_entry, ManifestRecord};
