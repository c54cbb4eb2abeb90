//! Cache directory layout.
//!
//! ```text
//! <cache_dir>/<name>.jpg          saved primary image
//! <cache_dir>/<name>_thumb.jpg    its thumbnail
//! <cache_dir>/remote/<hash>       raw bytes of a fetched remote asset
//! ```
//!
//! `<hash>` is the hex BLAKE3 digest of the request key, so the file name is
//! stable across processes and platforms.

use std::path::{Component, Path, PathBuf};

use agentchat_shared::constants::{IMAGE_EXTENSION, REMOTE_CACHE_SUBDIR, THUMBNAIL_SUFFIX};
use tokio::fs;
use uuid::Uuid;

use crate::error::{CacheError, Result};

/// Reject names that could escape the cache directory.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
        || name.contains('\0')
    {
        return Err(CacheError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Caller-supplied base name, or a fresh UUID.
pub fn base_name(hint: Option<&str>) -> Result<String> {
    match hint {
        Some(name) => {
            validate_name(name)?;
            Ok(name.to_string())
        }
        None => Ok(Uuid::new_v4().to_string()),
    }
}

/// `<dir>/<name>.jpg`
pub fn primary_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{IMAGE_EXTENSION}"))
}

/// `<dir>/<name>_thumb.jpg`
pub fn thumbnail_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{THUMBNAIL_SUFFIX}.{IMAGE_EXTENSION}"))
}

/// Disk-tier location of a remote key.
pub fn remote_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(REMOTE_CACHE_SUBDIR)
        .join(blake3::hash(key.as_bytes()).to_hex().as_str())
}

/// Last normal component of `path`, if any. Works for both `/` and `\`
/// separated inputs regardless of platform.
pub fn file_name(path: &str) -> Option<&str> {
    let last = path.rsplit(['/', '\\']).next()?;
    match last {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Join `name` onto `base`, refusing anything but plain file names.
pub fn within(base: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(base.join(name)),
        _ => Err(CacheError::InvalidName(name.to_string())),
    }
}

/// Write `data` to `path` by writing a sibling temp file and renaming it
/// over the target, so readers never see a half-written file.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CacheError::InvalidName(path.display().to_string()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CacheError::InvalidName(path.display().to_string()))?;

    fs::create_dir_all(parent).await?;

    let tmp = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));
    if let Err(e) = fs::write(&tmp, data).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
