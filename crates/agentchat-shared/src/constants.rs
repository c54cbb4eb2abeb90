/// Name of the directory (under the platform cache dir) holding saved images
pub const IMAGE_CACHE_DIR: &str = "ImageCache";

/// Sub-directory of the image cache holding fetched remote assets
pub const REMOTE_CACHE_SUBDIR: &str = "remote";

/// Extension of primary saved images
pub const IMAGE_EXTENSION: &str = "jpg";

/// Suffix appended to a saved image's base name for its thumbnail
pub const THUMBNAIL_SUFFIX: &str = "_thumb";

/// JPEG quality used for primary saved images (0-100)
pub const PRIMARY_JPEG_QUALITY: u8 = 70;

/// JPEG quality used for thumbnails (0-100)
pub const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Thumbnail bounding box in pixels
pub const THUMBNAIL_BOX: (u32, u32) = (150, 150);

/// Memory tier entry limit
pub const MEMORY_COUNT_LIMIT: usize = 100;

/// Memory tier decoded-byte limit (50 MiB)
pub const MEMORY_BYTE_LIMIT: usize = 50 * 1024 * 1024;

/// Storage key of the serialized message collection
pub const MESSAGES_KEY: &str = "cached_messages";

/// Storage key of the seed-data flag
pub const SEEDED_KEY: &str = "has_seeded_data";
