//! Application configuration loaded from environment variables.
//!
//! Every setting has a default so the tool runs with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use agentchat_media::AssetCacheConfig;
use agentchat_shared::constants::{MEMORY_BYTE_LIMIT, MEMORY_COUNT_LIMIT};
use agentchat_store::Database;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory for saved images and the remote disk tier.
    /// Env: `AGENTCHAT_CACHE_DIR`
    /// Default: platform cache dir + `ImageCache`
    pub cache_dir: Option<PathBuf>,

    /// SQLite file holding the transcript.
    /// Env: `AGENTCHAT_DB_PATH`
    /// Default: platform data dir + `agentchat.db`
    pub db_path: Option<PathBuf>,

    /// Maximum number of images held in memory.
    /// Env: `AGENTCHAT_MEMORY_COUNT`
    /// Default: `100`
    pub memory_count_limit: usize,

    /// Maximum decoded bytes held in memory.
    /// Env: `AGENTCHAT_MEMORY_BYTES`
    /// Default: 50 MiB
    pub memory_byte_limit: usize,

    /// Whole-request timeout for image downloads.
    /// Env: `AGENTCHAT_FETCH_TIMEOUT_SECS`
    /// Default: `30`
    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            db_path: None,
            memory_count_limit: MEMORY_COUNT_LIMIT,
            memory_byte_limit: MEMORY_BYTE_LIMIT,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("AGENTCHAT_CACHE_DIR").filter(|v| !v.is_empty()) {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(path) = lookup("AGENTCHAT_DB_PATH").filter(|v| !v.is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("AGENTCHAT_MEMORY_COUNT") {
            match val.parse::<usize>() {
                Ok(n) => config.memory_count_limit = n,
                Err(_) => tracing::warn!(value = %val, "Invalid AGENTCHAT_MEMORY_COUNT, using default"),
            }
        }

        if let Some(val) = lookup("AGENTCHAT_MEMORY_BYTES") {
            match val.parse::<usize>() {
                Ok(n) => config.memory_byte_limit = n,
                Err(_) => tracing::warn!(value = %val, "Invalid AGENTCHAT_MEMORY_BYTES, using default"),
            }
        }

        if let Some(val) = lookup("AGENTCHAT_FETCH_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.fetch_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid AGENTCHAT_FETCH_TIMEOUT_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// Asset cache settings derived from this configuration.
    pub fn asset_cache(&self) -> anyhow::Result<AssetCacheConfig> {
        let mut cache = match &self.cache_dir {
            Some(dir) => AssetCacheConfig::new(dir),
            None => AssetCacheConfig::platform_default()?,
        };
        cache.memory_count_limit = self.memory_count_limit;
        cache.memory_byte_limit = self.memory_byte_limit;
        Ok(cache)
    }

    /// Location of the transcript database.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Database::default_path()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.memory_count_limit, 100);
        assert_eq!(config.memory_byte_limit, 50 * 1024 * 1024);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AGENTCHAT_CACHE_DIR", "/tmp/images"),
            ("AGENTCHAT_DB_PATH", "/tmp/chat.db"),
            ("AGENTCHAT_MEMORY_COUNT", "5"),
            ("AGENTCHAT_FETCH_TIMEOUT_SECS", "3"),
        ]));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/images")));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/chat.db"));
        assert_eq!(config.memory_count_limit, 5);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));

        let cache = config.asset_cache().unwrap();
        assert_eq!(cache.cache_dir, PathBuf::from("/tmp/images"));
        assert_eq!(cache.memory_count_limit, 5);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AGENTCHAT_MEMORY_COUNT", "lots"),
            ("AGENTCHAT_MEMORY_BYTES", "-1"),
            ("AGENTCHAT_FETCH_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.memory_count_limit, 100);
        assert_eq!(config.memory_byte_limit, 50 * 1024 * 1024);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }
}
