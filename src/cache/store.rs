//! File-backed cache store
//!
//! Layout of a cache directory:
//!
//! ```text
//! <dir>/<key>          docker-save archive
//! <dir>/<key>.json     manifest record (commit marker)
//! <dir>/.<key>.*.tmp   staged writes, never read
//! ```
//!
//! An entry only counts once its manifest exists, and the manifest is
//! always renamed into place after the archive. A crash mid-write leaves at
//! most hidden temp files or an orphan archive, both of which probe as
//! absent.

use crate::cache::key::CacheKey;
use crate::cache::probe::{LocalLookup, ProbeOutcome};
use crate::cache::writer::ManifestRecord;
use crate::config::CacheOptions;
use crate::error::{WarmError, WarmResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use uuid::Uuid;

/// Cache entries on the local filesystem
#[derive(Debug)]
pub struct FsCacheStore {
    dir: PathBuf,
    locks: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl FsCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.archive_file())
    }

    pub fn manifest_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.manifest_file())
    }

    /// Exclusive access to one key for the lifetime of the guard
    pub async fn lock(&self, key: &CacheKey) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        KeyGuard {
            store: self,
            key: key.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Forget the key's lock once nobody holds or waits on it
    fn release(&self, key: &CacheKey) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Open hidden temp files for a new entry
    pub async fn stage(&self, key: &CacheKey) -> WarmResult<StagedEntry> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| WarmError::store(&self.dir, e))?;

        let nonce = Uuid::new_v4().simple();
        let archive_tmp = self.dir.join(format!(".{}.{}.archive.tmp", key, nonce));
        let manifest_tmp = self.dir.join(format!(".{}.{}.json.tmp", key, nonce));

        let archive = create(&archive_tmp).await?;
        let manifest = match create(&manifest_tmp).await {
            Ok(file) => file,
            Err(e) => {
                remove_quietly(&archive_tmp).await;
                return Err(e);
            }
        };

        Ok(StagedEntry {
            archive,
            manifest,
            pending: PendingCommit {
                archive_tmp,
                manifest_tmp,
                archive_path: self.archive_path(key),
                manifest_path: self.manifest_path(key),
            },
        })
    }
}

/// Held while one key is being warmed
#[derive(Debug)]
pub struct KeyGuard<'a> {
    store: &'a FsCacheStore,
    key: CacheKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Unlock before checking, or the guard's own handle keeps the entry
        drop(self.guard.take());
        self.store.release(&self.key);
    }
}

async fn create(path: &Path) -> WarmResult<File> {
    File::create(path)
        .await
        .map_err(|e| WarmError::store(path, e))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            debug!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Whether an entry written at `cached_at` has outlived `ttl` at `now`
pub fn is_expired(cached_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| cached_at.checked_add_signed(ttl))
    {
        Some(expires_at) => expires_at <= now,
        None => false,
    }
}

#[async_trait]
impl LocalLookup for FsCacheStore {
    async fn probe(&self, opts: &CacheOptions, key: &CacheKey) -> WarmResult<ProbeOutcome> {
        let manifest_path = opts.dir.join(key.manifest_file());
        let content = match fs::read(&manifest_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache manifest for {}", key);
                return Ok(ProbeOutcome::Absent);
            }
            Err(e) => {
                return Err(WarmError::io(
                    format!("reading cache manifest {}", manifest_path.display()),
                    e,
                ))
            }
        };

        let archive_path = opts.dir.join(key.archive_file());
        match fs::metadata(&archive_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache manifest for {} has no archive", key);
                return Ok(ProbeOutcome::Absent);
            }
            Err(e) => {
                return Err(WarmError::io(
                    format!("reading cache archive {}", archive_path.display()),
                    e,
                ))
            }
        }

        let record: ManifestRecord =
            serde_json::from_slice(&content).map_err(|e| WarmError::CacheEntryCorrupt {
                path: manifest_path.clone(),
                reason: e.to_string(),
            })?;

        if is_expired(record.cached_at, opts.ttl, Utc::now()) {
            debug!("Cache entry {} is stale (cached {})", key, record.cached_at);
            Ok(ProbeOutcome::Stale(record))
        } else {
            Ok(ProbeOutcome::Valid(record))
        }
    }
}

/// Temp files for an entry being written
#[derive(Debug)]
pub struct StagedEntry {
    pub archive: File,
    pub manifest: File,
    pending: PendingCommit,
}

impl StagedEntry {
    /// Separate the sinks from the commit step
    pub fn split(self) -> (File, File, PendingCommit) {
        (self.archive, self.manifest, self.pending)
    }
}

/// Renames that publish a staged entry
#[derive(Debug)]
pub struct PendingCommit {
    archive_tmp: PathBuf,
    manifest_tmp: PathBuf,
    archive_path: PathBuf,
    manifest_path: PathBuf,
}

impl PendingCommit {
    /// Sync both files and move them into place, archive first.
    ///
    /// A manifest left by an earlier entry is removed before the archive is
    /// replaced, so the old record never describes the new archive.
    pub async fn commit(self, mut archive: File, mut manifest: File) -> WarmResult<()> {
        if let Err(e) = self.sync(&mut archive, &mut manifest).await {
            drop(archive);
            drop(manifest);
            self.discard().await;
            return Err(e);
        }
        drop(archive);
        drop(manifest);

        match fs::remove_file(&self.manifest_path).await {
            Ok(()) => debug!("Retracted previous entry {}", self.manifest_path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                let err = WarmError::store(&self.manifest_path, e);
                self.discard().await;
                return Err(err);
            }
        }

        if let Err(e) = fs::rename(&self.archive_tmp, &self.archive_path).await {
            let err = WarmError::store(&self.archive_path, e);
            self.discard().await;
            return Err(err);
        }
        if let Err(e) = fs::rename(&self.manifest_tmp, &self.manifest_path).await {
            remove_quietly(&self.manifest_tmp).await;
            return Err(WarmError::store(&self.manifest_path, e));
        }

        debug!("Committed cache entry {}", self.manifest_path.display());
        Ok(())
    }

    async fn sync(&self, archive: &mut File, manifest: &mut File) -> WarmResult<()> {
        for (file, path) in [(archive, &self.archive_tmp), (manifest, &self.manifest_tmp)] {
            file.flush()
                .await
                .map_err(|e| WarmError::io(format!("flushing {}", path.display()), e))?;
            file.sync_all()
                .await
                .map_err(|e| WarmError::io(format!("syncing {}", path.display()), e))?;
        }
        Ok(())
    }

    /// Remove the temp files; nothing becomes visible
    pub async fn discard(self) {
        remove_quietly(&self.archive_tmp).await;
        remove_quietly(&self.manifest_tmp).await;
    }
}
