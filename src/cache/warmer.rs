//! Cache warmer
//!
//! Per image: probe the local cache, and only when the entry is absent
//! fetch from the registry and write the entry into the two sinks.
//!
//! | Probe    | Fetch | Sinks written | Result          |
//! |----------|-------|---------------|-----------------|
//! | Absent   | yes   | on success    | `Ok(Warmed)`    |
//! | Valid    | no    | no            | `AlreadyCached` |
//! | Stale    | no    | no            | `AlreadyCached` |
//! | error    | no    | no            | error unchanged |
//!
//! The two halves are also exposed separately ([`Warmer::probe`] and
//! [`Warmer::fetch_into`]) so a store can open its sinks only after the
//! probe has decided a fetch is needed.

use crate::cache::key::CacheKey;
use crate::cache::probe::{LocalLookup, ProbeOutcome};
use crate::cache::writer::write_entry;
use crate::config::WarmerOptions;
use crate::error::{WarmError, WarmResult};
use crate::image::Image;
use crate::registry::RemoteFetcher;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

/// A successful warm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warmed {
    pub key: CacheKey,
    /// Manifest digest of the fetched image
    pub digest: String,
}

/// Warms images through a local lookup and a remote fetcher
pub struct Warmer {
    local: Arc<dyn LocalLookup>,
    remote: Arc<dyn RemoteFetcher>,
}

impl Warmer {
    pub fn new(local: Arc<dyn LocalLookup>, remote: Arc<dyn RemoteFetcher>) -> Self {
        Self { local, remote }
    }

    /// Make sure `image` is in the cache, writing a new entry into the sinks.
    ///
    /// Returns [`WarmError::AlreadyCached`] when an entry exists, whether or
    /// not it is past its TTL. With `opts.force` the probe is skipped.
    pub async fn warm<A, M>(
        &self,
        image: &Image,
        opts: &WarmerOptions,
        archive: &mut A,
        manifest: &mut M,
    ) -> WarmResult<Warmed>
    where
        A: AsyncWrite + Unpin + Send,
        M: AsyncWrite + Unpin + Send,
    {
        let key = self.probe(image, opts).await?;
        self.fetch_into(image, &key, opts, archive, manifest).await
    }

    /// Decide whether `image` needs fetching; `Ok` carries its cache key
    pub async fn probe(&self, image: &Image, opts: &WarmerOptions) -> WarmResult<CacheKey> {
        let key = image.cache_key(&opts.platform);

        if opts.force {
            debug!("Force set, not probing cache for {}", image);
            return Ok(key);
        }

        let outcome = self.local.probe(&opts.cache, &key).await?;
        if let Some(record) = outcome.record() {
            debug!(
                "{} is {} in cache ({}, cached {})",
                image,
                outcome.state(),
                key,
                record.cached_at
            );
            return Err(WarmError::AlreadyCached {
                reference: image.reference.clone(),
                key: key.to_string(),
                state: outcome.state(),
            });
        }

        debug!("{} not cached, fetching", image);
        Ok(key)
    }

    /// Fetch `image` and write its entry under `key` into the sinks
    pub async fn fetch_into<A, M>(
        &self,
        image: &Image,
        key: &CacheKey,
        opts: &WarmerOptions,
        archive: &mut A,
        manifest: &mut M,
    ) -> WarmResult<Warmed>
    where
        A: AsyncWrite + Unpin + Send,
        M: AsyncWrite + Unpin + Send,
    {
        let platform = image.effective_platform(&opts.platform);
        let fetched = self
            .remote
            .fetch(&image.reference, &opts.registry, &platform)
            .await?;

        write_entry(archive, manifest, image, key, &fetched).await?;

        info!("Warmed {} ({})", image, fetched.digest);
        Ok(Warmed {
            key: key.clone(),
            digest: fetched.digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::probe::CacheState;
    use crate::cache::testing::{FakeFetcher, FakeLookup};
    use crate::cache::writer::ManifestRecord;
    use crate::platform::Platform;
    use std::sync::atomic::Ordering;

    fn warmer(outcome: WarmResult<ProbeOutcome>, fetcher: Arc<FakeFetcher>) -> Warmer {
        Warmer::new(Arc::new(FakeLookup::new(outcome)), fetcher)
    }

    fn opts() -> WarmerOptions {
        WarmerOptions {
            platform: Platform::new("linux", "amd64", None),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn absent_fetches_and_writes_both_sinks() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let warmer = warmer(Ok(ProbeOutcome::Absent), Arc::clone(&fetcher));
        let image = Image::new("alpine:latest");
        let (mut archive, mut manifest) = (Vec::new(), Vec::new());

        let warmed = warmer
            .warm(&image, &opts(), &mut archive, &mut manifest)
            .await
            .unwrap();

        assert_eq!(warmed.key, CacheKey::new("alpine:latest", "linux/amd64"));
        assert_eq!(warmed.digest, "sha256:feed");
        assert_eq!(fetcher.calls(), 1);
        assert!(!archive.is_empty());
        assert!(!manifest.is_empty());
    }

    #[tokio::test]
    async fn stale_is_already_cached_and_writes_nothing() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let record = ManifestRecord::sample("alpine:latest");
        let warmer = warmer(Ok(ProbeOutcome::Stale(record)), Arc::clone(&fetcher));
        let (mut archive, mut manifest) = (Vec::new(), Vec::new());

        let err = warmer
            .warm(&Image::new("alpine:latest"), &opts(), &mut archive, &mut manifest)
            .await
            .unwrap_err();

        assert!(err.is_already_cached());
        assert!(matches!(
            err,
            WarmError::AlreadyCached {
                state: CacheState::Stale,
                ..
            }
        ));
        assert_eq!(fetcher.calls(), 0);
        assert!(archive.is_empty());
        assert!(manifest.is_empty());
    }

    #[tokio::test]
    async fn valid_is_already_cached() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let record = ManifestRecord::sample("alpine:latest");
        let warmer = warmer(Ok(ProbeOutcome::Valid(record)), Arc::clone(&fetcher));

        let err = warmer
            .probe(&Image::new("alpine:latest"), &opts())
            .await
            .unwrap_err();

        assert!(err.is_already_cached());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_writes_nothing() {
        let fetcher = Arc::new(FakeFetcher::failing());
        let warmer = warmer(Ok(ProbeOutcome::Absent), Arc::clone(&fetcher));
        let (mut archive, mut manifest) = (Vec::new(), Vec::new());

        let err = warmer
            .warm(&Image::new("alpine:latest"), &opts(), &mut archive, &mut manifest)
            .await
            .unwrap_err();

        assert!(matches!(err, WarmError::ImagePull { .. }));
        assert!(!err.is_already_cached());
        assert!(archive.is_empty());
        assert!(manifest.is_empty());
    }

    #[tokio::test]
    async fn probe_error_propagates_without_fetch() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let probe_err = WarmError::io(
            "reading cache manifest",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let warmer = warmer(Err(probe_err), Arc::clone(&fetcher));

        let err = warmer
            .probe(&Image::new("alpine:latest"), &opts())
            .await
            .unwrap_err();

        assert!(matches!(err, WarmError::Io { .. }));
        assert!(!err.is_already_cached());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn force_skips_probe() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let lookup = Arc::new(FakeLookup::new(Ok(ProbeOutcome::Valid(
            ManifestRecord::sample("alpine:latest"),
        ))));
        let warmer = Warmer::new(lookup.clone(), fetcher.clone());
        let opts = WarmerOptions {
            force: true,
            ..opts()
        };
        let (mut archive, mut manifest) = (Vec::new(), Vec::new());

        warmer
            .warm(&Image::new("alpine:latest"), &opts, &mut archive, &mut manifest)
            .await
            .unwrap();

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn probe_keys_on_fetched_platform() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let lookup = Arc::new(FakeLookup::new(Ok(ProbeOutcome::Absent)));
        let warmer = Warmer::new(lookup.clone(), fetcher.clone());
        let arm64 = WarmerOptions {
            platform: Platform::new("linux", "arm64", None),
            ..opts()
        };

        let key = warmer.probe(&Image::new("alpine:latest"), &arm64).await.unwrap();

        assert_eq!(key, CacheKey::new("alpine:latest", "linux/arm64"));
        assert_eq!(*lookup.keys.lock().unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn platform_falls_back_to_run_default() {
        let fetcher = Arc::new(FakeFetcher::ok());
        let (mut archive, mut manifest) = (Vec::new(), Vec::new());

        let first = warmer(Ok(ProbeOutcome::Absent), Arc::clone(&fetcher));
        first
            .warm(&Image::new("alpine:latest"), &opts(), &mut archive, &mut manifest)
            .await
            .unwrap();

        let second = warmer(Ok(ProbeOutcome::Absent), Arc::clone(&fetcher));
        second
            .warm(
                &Image::with_platform("alpine:latest", "linux/arm64"),
                &opts(),
                &mut archive,
                &mut manifest,
            )
            .await
            .unwrap();

        assert_eq!(
            *fetcher.platforms.lock().unwrap(),
            vec!["linux/amd64".to_string(), "linux/arm64".to_string()]
        );
    }
}
