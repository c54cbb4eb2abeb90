//! Asset cache configuration.

use std::path::PathBuf;

use agentchat_shared::constants::{
    IMAGE_CACHE_DIR, MEMORY_BYTE_LIMIT, MEMORY_COUNT_LIMIT, PRIMARY_JPEG_QUALITY, THUMBNAIL_BOX,
    THUMBNAIL_JPEG_QUALITY,
};
use directories::ProjectDirs;

use crate::error::{CacheError, Result};

/// Tunables for [`AssetCache`](crate::AssetCache).
#[derive(Debug, Clone)]
pub struct AssetCacheConfig {
    /// Directory holding saved images, thumbnails and the remote disk tier.
    pub cache_dir: PathBuf,

    /// Maximum number of decoded images kept in memory.
    pub memory_count_limit: usize,

    /// Maximum decoded size (bytes) of all images kept in memory.
    pub memory_byte_limit: usize,

    /// Whether fetched remote assets are also written to disk.
    pub disk_tier: bool,

    /// JPEG quality of saved primary images.
    pub primary_quality: u8,

    /// JPEG quality of saved thumbnails.
    pub thumbnail_quality: u8,

    /// Box the thumbnail is fitted into, aspect ratio preserved.
    pub thumbnail_box: (u32, u32),
}

impl AssetCacheConfig {
    /// Defaults rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            memory_count_limit: MEMORY_COUNT_LIMIT,
            memory_byte_limit: MEMORY_BYTE_LIMIT,
            disk_tier: true,
            primary_quality: PRIMARY_JPEG_QUALITY,
            thumbnail_quality: THUMBNAIL_JPEG_QUALITY,
            thumbnail_box: THUMBNAIL_BOX,
        }
    }

    /// Defaults rooted at the platform cache directory:
    /// - Linux:   `~/.cache/agentchat/ImageCache`
    /// - macOS:   `~/Library/Caches/com.agentchat.agentchat/ImageCache`
    /// - Windows: `{FOLDERID_LocalAppData}\agentchat\agentchat\cache\ImageCache`
    pub fn platform_default() -> Result<Self> {
        let dirs =
            ProjectDirs::from("com", "agentchat", "agentchat").ok_or(CacheError::NoCacheDir)?;
        Ok(Self::new(dirs.cache_dir().join(IMAGE_CACHE_DIR)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssetCacheConfig::new("/tmp/cache");
        assert_eq!(config.memory_count_limit, 100);
        assert_eq!(config.memory_byte_limit, 50 * 1024 * 1024);
        assert_eq!(config.thumbnail_box, (150, 150));
        assert_eq!(config.primary_quality, 70);
        assert!(config.disk_tier);
    }
}
