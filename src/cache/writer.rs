//! Cache entry serialization
//!
//! An entry is two payloads: a tar archive in `docker save` layout holding
//! the config and every layer blob, and a JSON manifest record describing
//! the image. Both are built fully in memory before any sink sees a byte,
//! so a failure while assembling them leaves the sinks untouched.

use crate::cache::key::CacheKey;
use crate::error::{WarmError, WarmResult};
use crate::image::Image;
use crate::registry::{FetchedBlob, FetchedImage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Metadata stored next to each cached archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Image reference as written in the Dockerfile
    pub reference: String,
    /// Platform the image was fetched for
    pub platform: String,
    /// Cache key (hex)
    pub key: String,
    /// Manifest digest
    pub digest: String,
    /// Config blob digest
    pub config_digest: String,
    /// Layer digests, base layer first
    pub layers: Vec<String>,
    /// Image creation time from the config blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
}

/// One entry of a `docker save` manifest.json
#[derive(Serialize)]
struct SaveManifest<'a> {
    #[serde(rename = "Config")]
    config: String,
    #[serde(rename = "RepoTags")]
    repo_tags: Vec<&'a str>,
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

fn digest_hex<'a>(blob: &'a FetchedBlob, reference: &str) -> WarmResult<&'a str> {
    match blob.digest.split_once(':') {
        Some((_, hex)) if !hex.is_empty() && !hex.contains('/') => Ok(hex),
        _ => Err(WarmError::pull(
            reference,
            format!("blob has malformed digest '{}'", blob.digest),
        )),
    }
}

fn layer_extension(media_type: &str) -> &'static str {
    if media_type.ends_with("gzip") {
        "tar.gz"
    } else if media_type.ends_with("zstd") {
        "tar.zst"
    } else {
        "tar"
    }
}

fn append(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) -> WarmResult<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    builder
        .append_data(&mut header, path, data)
        .map_err(|e| WarmError::io(format!("archiving {}", path), e))
}

/// Combine config and layers into a single `docker save` style tar
pub fn build_archive(reference: &str, fetched: &FetchedImage) -> WarmResult<Vec<u8>> {
    let config_name = format!("{}.json", digest_hex(&fetched.config, reference)?);

    let mut layer_names = Vec::with_capacity(fetched.layers.len());
    for layer in &fetched.layers {
        let hex = digest_hex(layer, reference)?;
        layer_names.push(format!("{}.{}", hex, layer_extension(&layer.media_type)));
    }

    let repo_tags = if reference.contains('@') {
        Vec::new()
    } else {
        vec![reference]
    };
    let save_manifest = serde_json::to_vec(&[SaveManifest {
        config: config_name.clone(),
        repo_tags,
        layers: layer_names.clone(),
    }])?;

    let mut builder = tar::Builder::new(Vec::new());
    append(&mut builder, "manifest.json", &save_manifest)?;
    append(&mut builder, &config_name, &fetched.config.data)?;
    for (name, layer) in layer_names.iter().zip(&fetched.layers) {
        append(&mut builder, name, &layer.data)?;
    }

    builder
        .into_inner()
        .map_err(|e| WarmError::io("finishing cache archive", e))
}

/// Describe a fetched image for the manifest sink
pub fn build_manifest(image: &Image, key: &CacheKey, fetched: &FetchedImage) -> ManifestRecord {
    ManifestRecord {
        reference: image.reference.clone(),
        platform: fetched.platform.clone(),
        key: key.to_string(),
        digest: fetched.digest.clone(),
        config_digest: fetched.config.digest.clone(),
        layers: fetched.layers.iter().map(|l| l.digest.clone()).collect(),
        created: fetched.created(),
        cached_at: Utc::now(),
    }
}

/// Serialize a fetched image into the archive and manifest sinks
pub async fn write_entry<A, M>(
    archive: &mut A,
    manifest: &mut M,
    image: &Image,
    key: &CacheKey,
    fetched: &FetchedImage,
) -> WarmResult<()>
where
    A: AsyncWrite + Unpin + Send,
    M: AsyncWrite + Unpin + Send,
{
    let archive_bytes = build_archive(&image.reference, fetched)?;
    let manifest_bytes = serde_json::to_vec_pretty(&build_manifest(image, key, fetched))?;

    archive
        .write_all(&archive_bytes)
        .await
        .map_err(|e| WarmError::io("writing cache archive", e))?;
    archive
        .flush()
        .await
        .map_err(|e| WarmError::io("flushing cache archive", e))?;

    manifest
        .write_all(&manifest_bytes)
        .await
        .map_err(|e| WarmError::io("writing cache manifest", e))?;
    manifest
        .flush()
        .await
        .map_err(|e| WarmError::io("flushing cache manifest", e))?;

    debug!(
        "Wrote {} archive bytes and {} manifest bytes for {}",
        archive_bytes.len(),
        manifest_bytes.len(),
        key
    );
    Ok(())
}

#[cfg(test)]
impl ManifestRecord {
    pub(crate) fn sample(reference: &str) -> Self {
        let key = CacheKey::new(reference, "linux/amd64");
        Self {
            reference: reference.to_string(),
            platform: "linux/amd64".to_string(),
            key: key.to_string(),
            digest: "sha256:1111".to_string(),
            config_digest: "sha256:2222".to_string(),
            layers: vec!["sha256:3333".to_string()],
            created: None,
            cached_at: Utc::now(),
        }
    }
}
