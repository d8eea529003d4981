//! In-memory collaborators for warmer tests

use crate::cache::key::CacheKey;
use crate::cache::probe::{LocalLookup, ProbeOutcome};
use crate::config::{CacheOptions, RegistryOptions};
use crate::error::{WarmError, WarmResult};
use crate::registry::{FetchedBlob, FetchedImage, RemoteFetcher};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn fetched_image() -> FetchedImage {
    FetchedImage {
        digest: "sha256:feed".to_string(),
        platform: "linux/amd64".to_string(),
        config: FetchedBlob {
            digest: "sha256:c0ffee".to_string(),
            media_type: "application/vnd.oci.image.config.v1+json".to_string(),
            data: br#"{"created":"2024-01-15T10:00:00Z","architecture":"amd64","os":"linux"}"#
                .to_vec(),
        },
        layers: vec![
            FetchedBlob {
                digest: "sha256:aaaa".to_string(),
                media_type: "application/vnd.oci.image.layer.v1.tar+gzip".to_string(),
                data: b"layer-one".to_vec(),
            },
            FetchedBlob {
                digest: "sha256:bbbb".to_string(),
                media_type: "application/vnd.oci.image.layer.v1.tar".to_string(),
                data: b"layer-two".to_vec(),
            },
        ],
    }
}

/// Probe that always answers with a fixed outcome (or error)
pub struct FakeLookup {
    outcome: Mutex<Option<WarmResult<ProbeOutcome>>>,
    pub calls: AtomicUsize,
    pub keys: Mutex<Vec<CacheKey>>,
}

impl FakeLookup {
    pub fn new(outcome: WarmResult<ProbeOutcome>) -> Self {
        Self {
            outcome: Mutex::new(Some(outcome)),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LocalLookup for FakeLookup {
    async fn probe(&self, _opts: &CacheOptions, key: &CacheKey) -> WarmResult<ProbeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(key.clone());
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok(ProbeOutcome::Absent))
    }
}

/// Fetcher returning [`fetched_image`] or failing, and recording requests
pub struct FakeFetcher {
    fail: bool,
    pub calls: AtomicUsize,
    pub platforms: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            platforms: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn fetch(
        &self,
        reference: &str,
        _registry: &RegistryOptions,
        platform: &str,
    ) -> WarmResult<FetchedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.platforms.lock().unwrap().push(platform.to_string());
        // Yield so concurrent warms actually overlap
        tokio::task::yield_now().await;
        if self.fail {
            return Err(WarmError::pull(reference, "manifest unknown"));
        }
        Ok(fetched_image())
    }
}
