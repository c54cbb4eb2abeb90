//! The asset cache service.
//!
//! Resolution of a remote key walks memory → in-flight fetch → disk tier →
//! network. Every key has at most one fetch in flight: the fetch runs in its
//! own task and callers await a shared handle to it, so a caller that gives
//! up never cancels the fetch for the others. The task stores its result in
//! the memory tier *before* de-registering, so a caller that finds no
//! in-flight fetch always finds the result in memory instead.
//!
//! Local keys are resolved through the recently-saved index, the file at the
//! given path, and finally a file of the same name in the cache directory.
//!
//! The memory tier, the recently-saved index and the in-flight registry are
//! guarded by independent mutexes, none of which is held across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use agentchat_shared::locator::is_remote;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use image::DynamicImage;
use tokio::fs;
use tracing::{debug, info, trace, warn};

use crate::codec;
use crate::config::AssetCacheConfig;
use crate::error::{CacheError, Result};
use crate::fetch::Fetcher;
use crate::memory::MemoryTier;
use crate::paths;

/// Where a resolved image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The in-memory tier.
    Memory,
    /// A file: the remote disk tier or a local path.
    Disk,
    /// A network fetch.
    Network,
    /// The recently-saved index.
    LocalSave,
}

/// A resolved image.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key the caller asked for.
    pub key: String,
    pub image: Arc<DynamicImage>,
    pub origin: Origin,
}

impl CacheEntry {
    fn new(key: &str, image: Arc<DynamicImage>, origin: Origin) -> Self {
        Self {
            key: key.to_string(),
            image,
            origin,
        }
    }
}

/// Result of [`AssetCache::save_locally`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAsset {
    /// Absolute path of the compressed primary image.
    pub path: String,
    /// Size of the primary file in bytes.
    pub byte_size: u64,
    /// Path of the thumbnail, `None` if it could not be produced.
    pub thumbnail_path: Option<String>,
}

/// Point-in-time sizes of the cache's structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub memory_bytes: usize,
    pub recent_entries: usize,
    pub in_flight: usize,
}

type Flight = Shared<BoxFuture<'static, Option<CacheEntry>>>;

enum Joined {
    /// The result landed in memory while we were deciding.
    Ready(Arc<DynamicImage>),
    Flight(Flight),
}

/// Image cache handle. Cloning is cheap and every clone shares state.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<Inner>,
}

struct Inner {
    config: AssetCacheConfig,
    fetcher: Arc<dyn Fetcher>,
    memory: Mutex<MemoryTier>,
    recent: Mutex<HashMap<String, Arc<DynamicImage>>>,
    in_flight: Mutex<HashMap<String, Flight>>,
}

/// Every structure stays consistent between single map operations, so a
/// poisoned lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn decode_blocking(bytes: Bytes) -> Result<DynamicImage> {
    tokio::task::spawn_blocking(move || codec::decode(&bytes)).await?
}

/// Decode a file's bytes, trusting the extension first and sniffing the
/// content second.
async fn decode_file_blocking(bytes: Vec<u8>, path: PathBuf) -> Result<DynamicImage> {
    tokio::task::spawn_blocking(move || {
        codec::decode_as_extension(&bytes, &path).or_else(|e| {
            trace!(path = %path.display(), error = %e, "extension decode failed, sniffing");
            codec::decode(&bytes)
        })
    })
    .await?
}

impl AssetCache {
    /// Create the cache, making sure its directory exists.
    pub async fn new(config: AssetCacheConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir).await?;

        info!(
            path = %config.cache_dir.display(),
            memory_count_limit = config.memory_count_limit,
            memory_byte_limit = config.memory_byte_limit,
            disk_tier = config.disk_tier,
            "asset cache initialized"
        );

        let memory = MemoryTier::new(config.memory_count_limit, config.memory_byte_limit);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                memory: Mutex::new(memory),
                recent: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &AssetCacheConfig {
        &self.inner.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.inner.config.cache_dir
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve `key` (a URL or a local path) to an image.
    pub async fn resolve(&self, key: &str) -> Option<Arc<DynamicImage>> {
        self.resolve_entry(key).await.map(|entry| entry.image)
    }

    /// Like [`resolve`](Self::resolve) but also reports where the image came
    /// from.
    ///
    /// Concurrent calls for the same uncached remote key share one fetch and
    /// all observe its result. Dropping the returned future only abandons
    /// this caller's interest.
    pub async fn resolve_entry(&self, key: &str) -> Option<CacheEntry> {
        if let Some(image) = lock(&self.inner.memory).get(key) {
            trace!(key, "memory hit");
            return Some(CacheEntry::new(key, image, Origin::Memory));
        }

        if !is_remote(key) {
            return self.local_resolve_entry(key).await;
        }

        match self.join_or_start(key) {
            Joined::Ready(image) => Some(CacheEntry::new(key, image, Origin::Memory)),
            Joined::Flight(flight) => flight.await,
        }
    }

    /// Whether `key` is currently held by the memory tier.
    pub fn is_cached(&self, key: &str) -> bool {
        lock(&self.inner.memory).contains(key)
    }

    fn join_or_start(&self, key: &str) -> Joined {
        let mut in_flight = lock(&self.inner.in_flight);

        if let Some(flight) = in_flight.get(key) {
            debug!(key, "joining in-flight fetch");
            return Joined::Flight(flight.clone());
        }

        // a fetch may have finished between the memory check and here
        if let Some(image) = lock(&self.inner.memory).get(key) {
            return Joined::Ready(image);
        }

        let inner = Arc::clone(&self.inner);
        let owned = key.to_string();
        // The task cannot de-register before we register: it needs the
        // `in_flight` lock we are holding.
        let task = tokio::spawn(async move {
            let entry = inner.fetch_remote(&owned).await;
            if let Some(entry) = &entry {
                lock(&inner.memory).insert(&owned, Arc::clone(&entry.image));
            }
            lock(&inner.in_flight).remove(&owned);
            entry
        });

        let flight = async move {
            match task.await.map_err(CacheError::from) {
                Ok(entry) => entry,
                Err(e) if e.is_cancelled() => {
                    debug!("fetch task cancelled");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "fetch task failed");
                    None
                }
            }
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), flight.clone());
        debug!(key, "started fetch");
        Joined::Flight(flight)
    }

    /// Resolve a local path to an image.
    pub async fn local_resolve(&self, path: &str) -> Option<Arc<DynamicImage>> {
        self.local_resolve_entry(path).await.map(|entry| entry.image)
    }

    /// Resolve a local path, trying in order: the recently-saved index, the
    /// file at `path`, and a file with the same name in the cache directory.
    /// Any hit is remembered in the recently-saved index under `path`.
    pub async fn local_resolve_entry(&self, path: &str) -> Option<CacheEntry> {
        if let Some(image) = lock(&self.inner.recent).get(path).cloned() {
            trace!(path, "recently saved hit");
            return Some(CacheEntry::new(path, image, Origin::LocalSave));
        }

        let found = match self.load_file(Path::new(path)).await {
            Some(image) => Some(image),
            None => self.load_by_file_name(path).await,
        };

        match found {
            Some(image) => {
                let image = Arc::new(image);
                lock(&self.inner.recent).insert(path.to_string(), Arc::clone(&image));
                Some(CacheEntry::new(path, image, Origin::Disk))
            }
            None => {
                debug!(path, "could not load image");
                None
            }
        }
    }

    async fn load_file(&self, path: &Path) -> Option<DynamicImage> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "read failed");
                return None;
            }
        };

        match decode_file_blocking(bytes, path.to_path_buf()).await {
            Ok(image) => Some(image),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "file is not a readable image");
                None
            }
        }
    }

    /// Paths recorded by an earlier install may point into a directory that
    /// no longer exists while the file itself survives in the cache dir.
    async fn load_by_file_name(&self, path: &str) -> Option<DynamicImage> {
        let name = paths::file_name(path)?;
        let candidate = paths::within(self.cache_dir(), name).ok()?;
        if candidate == Path::new(path) {
            return None;
        }
        trace!(path, candidate = %candidate.display(), "trying cache directory");
        self.load_file(&candidate).await
    }

    // -----------------------------------------------------------------------
    // Saving
    // -----------------------------------------------------------------------

    /// Compress `image` into the cache directory as `<name>.jpg` together
    /// with a `<name>_thumb.jpg` thumbnail. `name` is `filename_hint` or a
    /// fresh UUID.
    ///
    /// Returns `None` if the primary image cannot be encoded or written. A
    /// thumbnail failure only leaves `thumbnail_path` empty.
    pub async fn save_locally(
        &self,
        image: DynamicImage,
        filename_hint: Option<&str>,
    ) -> Option<SavedAsset> {
        match self.try_save_locally(image, filename_hint).await {
            Ok(saved) => Some(saved),
            Err(e) => {
                warn!(error = %e, "failed to save image");
                None
            }
        }
    }

    /// Decode `bytes` and [`save_locally`](Self::save_locally) the result.
    pub async fn save_bytes_locally(
        &self,
        bytes: impl Into<Bytes>,
        filename_hint: Option<&str>,
    ) -> Option<SavedAsset> {
        let image = match decode_blocking(bytes.into()).await {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "failed to decode image to save");
                return None;
            }
        };
        self.save_locally(image, filename_hint).await
    }

    async fn try_save_locally(
        &self,
        image: DynamicImage,
        filename_hint: Option<&str>,
    ) -> Result<SavedAsset> {
        let name = paths::base_name(filename_hint)?;
        let config = &self.inner.config;
        let primary_path = paths::primary_path(&config.cache_dir, &name);
        let thumb_path = paths::thumbnail_path(&config.cache_dir, &name);

        let image = Arc::new(image);
        let source = Arc::clone(&image);
        let (primary_quality, thumb_quality, thumb_box) = (
            config.primary_quality,
            config.thumbnail_quality,
            config.thumbnail_box,
        );

        let (primary_bytes, thumb) = tokio::task::spawn_blocking(move || {
            let primary = codec::encode_jpeg(&source, primary_quality)?;
            let thumb = codec::thumbnail(&source, thumb_box).and_then(|thumb| {
                let bytes = codec::encode_jpeg(&thumb, thumb_quality)?;
                Ok((thumb, bytes))
            });
            Ok::<_, CacheError>((primary, thumb))
        })
        .await??;

        paths::write_atomic(&primary_path, &primary_bytes).await?;
        let path = primary_path.to_string_lossy().into_owned();
        lock(&self.inner.recent).insert(path.clone(), image);

        let thumbnail_path = match thumb {
            Ok((thumb_image, thumb_bytes)) => {
                match paths::write_atomic(&thumb_path, &thumb_bytes).await {
                    Ok(()) => {
                        let thumb_str = thumb_path.to_string_lossy().into_owned();
                        lock(&self.inner.recent).insert(thumb_str.clone(), Arc::new(thumb_image));
                        Some(thumb_str)
                    }
                    Err(e) => {
                        warn!(path = %thumb_path.display(), error = %e, "failed to write thumbnail");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(name = %name, error = %e, "thumbnail skipped");
                None
            }
        };

        info!(
            path = %path,
            size = primary_bytes.len(),
            thumbnail = ?thumbnail_path,
            "image saved"
        );

        Ok(SavedAsset {
            path,
            byte_size: primary_bytes.len() as u64,
            thumbnail_path,
        })
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Empty the memory tier and the recently-saved index. Files on disk and
    /// fetches in flight are left alone.
    pub fn clear(&self) {
        lock(&self.inner.memory).clear();
        lock(&self.inner.recent).clear();
        debug!("asset cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let (memory_entries, memory_bytes) = {
            let memory = lock(&self.inner.memory);
            (memory.len(), memory.bytes())
        };
        CacheStats {
            memory_entries,
            memory_bytes,
            recent_entries: lock(&self.inner.recent).len(),
            in_flight: lock(&self.inner.in_flight).len(),
        }
    }
}

impl fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCache")
            .field("cache_dir", &self.inner.config.cache_dir)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Inner {
    async fn fetch_remote(&self, key: &str) -> Option<CacheEntry> {
        match self.try_fetch_remote(key).await {
            Ok(entry) => Some(entry),
            Err(e) if e.is_cancelled() => {
                debug!(key, "fetch abandoned");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "failed to load image");
                None
            }
        }
    }

    async fn try_fetch_remote(&self, key: &str) -> Result<CacheEntry> {
        let disk_path = self
            .config
            .disk_tier
            .then(|| paths::remote_path(&self.config.cache_dir, key));

        if let Some(path) = &disk_path {
            if let Some(image) = self.read_disk_tier(path).await {
                debug!(key, "disk tier hit");
                return Ok(CacheEntry::new(key, Arc::new(image), Origin::Disk));
            }
        }

        let body = self.fetcher.fetch(key).await?;
        let image = decode_blocking(body.clone()).await?;

        if let Some(path) = &disk_path {
            if let Err(e) = paths::write_atomic(path, &body).await {
                warn!(key, error = %e, "failed to write disk tier");
            }
        }

        Ok(CacheEntry::new(key, Arc::new(image), Origin::Network))
    }

    async fn read_disk_tier(&self, path: &Path) -> Option<DynamicImage> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read disk tier");
                return None;
            }
        };

        match decode_blocking(Bytes::from(bytes)).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding corrupt disk tier entry");
                let _ = fs::remove_file(path).await;
                None
            }
        }
    }
}
