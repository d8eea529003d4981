//! OCI distribution fetcher
//!
//! Pulls the manifest (resolving a multi-arch index to one platform), the
//! config blob, and every layer blob of an image.

use crate::config::RegistryOptions;
use crate::error::{WarmError, WarmResult};
use crate::platform::Platform;
use crate::registry::auth::DockerCredentials;
use crate::registry::{FetchedBlob, FetchedImage, RemoteFetcher};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::manifest::{ImageIndexEntry, OciDescriptor, OciImageManifest, OciManifest};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use tracing::debug;

/// Fetches images with `oci-distribution`
#[derive(Debug, Default, Clone)]
pub struct OciFetcher;

impl OciFetcher {
    pub fn new() -> Self {
        Self
    }
}

/// Client settings for the given registry options
pub fn client_config(registry: &RegistryOptions) -> ClientConfig {
    let protocol = if registry.insecure_registries.is_empty() {
        ClientProtocol::Https
    } else {
        ClientProtocol::HttpsExcept(registry.insecure_registries.clone())
    };

    ClientConfig {
        protocol,
        accept_invalid_certificates: registry.skip_tls_verify,
        ..Default::default()
    }
}

/// Pick the index entry for `target`.
///
/// An exact match (including variant) wins over an entry that only agrees
/// on os and architecture.
pub fn select_manifest<'a>(
    entries: &'a [ImageIndexEntry],
    target: &Platform,
) -> Option<&'a ImageIndexEntry> {
    let with_platform = || {
        entries
            .iter()
            .filter_map(|entry| entry.platform.as_ref().map(|p| (entry, p)))
    };

    with_platform()
        .find(|(_, p)| Platform::new(&p.os, &p.architecture, p.variant.as_deref()) == *target)
        .or_else(|| {
            with_platform()
                .find(|(_, p)| target.matches(&p.os, &p.architecture, p.variant.as_deref()))
        })
        .map(|(entry, _)| entry)
}

fn available_platforms(entries: &[ImageIndexEntry]) -> String {
    entries
        .iter()
        .filter_map(|e| e.platform.as_ref())
        .map(|p| Platform::new(&p.os, &p.architecture, p.variant.as_deref()).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

async fn pull_blob(
    client: &Client,
    image: &Reference,
    descriptor: &OciDescriptor,
    reference: &str,
) -> WarmResult<FetchedBlob> {
    let mut data = Vec::new();
    client
        .pull_blob(image, descriptor, &mut data)
        .await
        .map_err(|e| WarmError::pull(reference, format!("blob {}: {}", descriptor.digest, e)))?;

    debug!("Pulled blob {} ({} bytes)", descriptor.digest, data.len());
    Ok(FetchedBlob {
        digest: descriptor.digest.clone(),
        media_type: descriptor.media_type.clone(),
        data,
    })
}

impl OciFetcher {
    /// Resolve `image` to a single-platform manifest
    async fn resolve_manifest(
        &self,
        client: &Client,
        image: Reference,
        auth: &RegistryAuth,
        target: &Platform,
        reference: &str,
    ) -> WarmResult<(Reference, OciImageManifest, String)> {
        let (manifest, digest) = client
            .pull_manifest(&image, auth)
            .await
            .map_err(|e| WarmError::pull(reference, e))?;

        let index = match manifest {
            OciManifest::Image(manifest) => return Ok((image, manifest, digest)),
            OciManifest::ImageIndex(index) => index,
        };

        let entry = select_manifest(&index.manifests, target).ok_or_else(|| {
            WarmError::pull(
                reference,
                format!(
                    "no manifest for {}; available: {}",
                    target,
                    available_platforms(&index.manifests)
                ),
            )
        })?;
        debug!("Selected {} for {} from index", entry.digest, target);

        let pinned: Reference = format!(
            "{}/{}@{}",
            image.registry(),
            image.repository(),
            entry.digest
        )
        .parse()
        .map_err(|e| WarmError::InvalidReference {
            reference: reference.to_string(),
            reason: format!("{}", e),
        })?;

        let (manifest, digest) = client
            .pull_manifest(&pinned, auth)
            .await
            .map_err(|e| WarmError::pull(reference, e))?;

        match manifest {
            OciManifest::Image(manifest) => Ok((pinned, manifest, digest)),
            OciManifest::ImageIndex(_) => Err(WarmError::pull(
                reference,
                "nested image index is not supported",
            )),
        }
    }
}

#[async_trait]
impl RemoteFetcher for OciFetcher {
    async fn fetch(
        &self,
        reference: &str,
        registry: &RegistryOptions,
        platform: &str,
    ) -> WarmResult<FetchedImage> {
        let target: Platform = platform.parse()?;
        let image: Reference =
            reference
                .parse()
                .map_err(|e| WarmError::InvalidReference {
                    reference: reference.to_string(),
                    reason: format!("{}", e),
                })?;

        let credentials = DockerCredentials::load(registry.docker_config.as_deref()).await?;
        let auth = credentials.registry_auth(image.registry());
        let client = Client::new(client_config(registry));

        debug!("Fetching {} for {}", image, target);
        let (image, manifest, digest) = self
            .resolve_manifest(&client, image, &auth, &target, reference)
            .await?;

        let config = pull_blob(&client, &image, &manifest.config, reference).await?;
        let mut layers = Vec::with_capacity(manifest.layers.len());
        for layer in &manifest.layers {
            layers.push(pull_blob(&client, &image, layer, reference).await?);
        }

        debug!("Fetched {} ({} layers)", reference, layers.len());
        Ok(FetchedImage {
            digest,
            platform: target.to_string(),
            config,
            layers,
        })
    }
}
