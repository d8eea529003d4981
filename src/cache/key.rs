//! Cache key derivation

use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic cache identity of an image: hex SHA-256 of
/// `reference` + `\n` + `platform`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a reference and platform (platform may be empty)
    pub fn new(reference: &str, platform: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        hasher.update(b"\n");
        hasher.update(platform.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the layer archive in the cache directory
    pub fn archive_file(&self) -> String {
        self.0.clone()
    }

    /// File name of the manifest record in the cache directory
    pub fn manifest_file(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
