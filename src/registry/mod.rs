//! Registry access
//!
//! The warmer only sees the [`RemoteFetcher`] trait. Production code wires
//! [`OciFetcher`]; tests wire in-memory fakes.

pub mod auth;
pub mod oci;

pub use auth::DockerCredentials;
pub use oci::OciFetcher;

use crate::config::RegistryOptions;
use crate::error::WarmResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A blob pulled from a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBlob {
    /// Content digest (`sha256:...`)
    pub digest: String,
    /// OCI or Docker media type
    pub media_type: String,
    /// Raw blob bytes
    pub data: Vec<u8>,
}

/// A complete image (manifest, config, and every layer) pulled from a registry
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Manifest digest
    pub digest: String,
    /// Platform the manifest was selected for
    pub platform: String,
    /// Image config blob
    pub config: FetchedBlob,
    /// Layer blobs, base layer first
    pub layers: Vec<FetchedBlob>,
}

impl FetchedImage {
    /// Creation time recorded in the image config, if any
    pub fn created(&self) -> Option<DateTime<Utc>> {
        #[derive(Deserialize)]
        struct ConfigCreated {
            created: Option<DateTime<Utc>>,
        }

        serde_json::from_slice::<ConfigCreated>(&self.config.data)
            .ok()
            .and_then(|c| c.created)
    }
}

/// Retrieves a full image from a registry.
///
/// Implementations own authentication, manifest negotiation, and layer
/// download. Errors are returned as-is; callers do not retry.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch `reference` for `platform` (`os/arch[/variant]`)
    async fn fetch(
        &self,
        reference: &str,
        registry: &RegistryOptions,
        platform: &str,
    ) -> WarmResult<FetchedImage>;
}
