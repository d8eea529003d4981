//! Base image identity

use crate::cache::CacheKey;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single base image to warm.
///
/// Two images are equal only when both the reference and the platform match.
/// An empty platform means "use the run's default platform".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    /// Registry/repository with tag or digest (e.g. `alpine:latest`)
    pub reference: String,
    /// `os/arch[/variant]`, possibly empty
    pub platform: String,
}

impl Image {
    /// An image with no explicit platform
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            platform: String::new(),
        }
    }

    /// An image pinned to a platform
    pub fn with_platform(reference: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            platform: platform.into(),
        }
    }

    /// Platform the image is fetched for: its own, else `default`
    pub fn effective_platform(&self, default: &Platform) -> String {
        if self.platform.is_empty() {
            default.to_string()
        } else {
            self.platform.clone()
        }
    }

    /// Cache key of the image as fetched on top of `default`
    pub fn cache_key(&self, default: &Platform) -> CacheKey {
        CacheKey::new(&self.reference, &self.effective_platform(default))
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.platform.is_empty() {
            write!(f, "{}", self.reference)
        } else {
            write!(f, "{} ({})", self.reference, self.platform)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_needs_both_fields() {
        assert_eq!(Image::new("alpine:latest"), Image::new("alpine:latest"));
        assert_ne!(
            Image::new("alpine:latest"),
            Image::with_platform("alpine:latest", "linux/amd64")
        );
    }

    #[test]
    fn display_includes_platform_when_set() {
        assert_eq!(Image::new("alpine:3.19").to_string(), "alpine:3.19");
        assert_eq!(
            Image::with_platform("alpine:3.19", "linux/arm64").to_string(),
            "alpine:3.19 (linux/arm64)"
        );
    }

    fn amd64() -> Platform {
        Platform::new("linux", "amd64", None)
    }

    #[test]
    fn effective_platform_prefers_own() {
        assert_eq!(Image::new("golang:1.20").effective_platform(&amd64()), "linux/amd64");
        assert_eq!(
            Image::with_platform("golang:1.20", "linux/arm64").effective_platform(&amd64()),
            "linux/arm64"
        );
    }

    #[test]
    fn cache_key_follows_effective_platform() {
        let arm64 = Platform::new("linux", "arm64", None);
        let plain = Image::new("golang:1.20");

        assert_ne!(plain.cache_key(&amd64()), plain.cache_key(&arm64));
        assert_eq!(
            plain.cache_key(&arm64),
            Image::with_platform("golang:1.20", "linux/arm64").cache_key(&amd64())
        );
        assert_eq!(
            plain.cache_key(&amd64()),
            CacheKey::new("golang:1.20", "linux/amd64")
        );
    }
}
