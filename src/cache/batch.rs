//! Warming many images into a file-backed store

use crate::cache::probe::LocalLookup;
use crate::cache::store::FsCacheStore;
use crate::cache::warmer::{Warmed, Warmer};
use crate::config::WarmerOptions;
use crate::error::WarmResult;
use crate::image::Image;
use crate::registry::RemoteFetcher;
use futures_util::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of warming one image
#[derive(Debug)]
pub struct WarmReport {
    pub image: Image,
    pub result: WarmResult<Warmed>,
}

/// Warm one image into `store`, publishing the entry only on success.
///
/// Holds the key's lock from probe to commit, so concurrent warms of the
/// same image fetch at most once. Nothing is written to the cache
/// directory unless the probe asks for a fetch.
pub async fn warm_to_store(
    store: &Arc<FsCacheStore>,
    remote: &Arc<dyn RemoteFetcher>,
    image: &Image,
    opts: &WarmerOptions,
) -> WarmResult<Warmed> {
    let _guard = store.lock(&image.cache_key(&opts.platform)).await;

    let local: Arc<dyn LocalLookup> = store.clone();
    let warmer = Warmer::new(local, Arc::clone(remote));
    let key = warmer.probe(image, opts).await?;

    let (mut archive, mut manifest, pending) = store.stage(&key).await?.split();
    match warmer
        .fetch_into(image, &key, opts, &mut archive, &mut manifest)
        .await
    {
        Ok(warmed) => {
            pending.commit(archive, manifest).await?;
            Ok(warmed)
        }
        Err(e) => {
            drop(archive);
            drop(manifest);
            pending.discard().await;
            Err(e)
        }
    }
}

/// Warm `images` with up to `jobs` in flight, yielding reports in input order
pub fn warm_stream<'a>(
    store: Arc<FsCacheStore>,
    remote: Arc<dyn RemoteFetcher>,
    images: Vec<Image>,
    opts: &'a WarmerOptions,
    jobs: usize,
) -> impl Stream<Item = WarmReport> + 'a {
    debug!("Warming {} image(s), {} at a time", images.len(), jobs.max(1));

    stream::iter(images)
        .map(move |image| {
            let store = Arc::clone(&store);
            let remote = Arc::clone(&remote);
            async move {
                let result = warm_to_store(&store, &remote, &image, opts).await;
                if let Err(e) = &result {
                    if !e.is_already_cached() {
                        warn!("Failed to warm {}: {}", image, e);
                    }
                }
                WarmReport { image, result }
            }
        })
        .buffered(jobs.max(1))
}

/// Collect [`warm_stream`] into a list
pub async fn warm_all(
    store: Arc<FsCacheStore>,
    remote: Arc<dyn RemoteFetcher>,
    images: Vec<Image>,
    opts: &WarmerOptions,
    jobs: usize,
) -> Vec<WarmReport> {
    warm_stream(store, remote, images, opts, jobs)
        .collect()
        .await
}
