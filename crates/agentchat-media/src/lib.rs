//! # agentchat-media
//!
//! Image asset cache for the chat client.
//!
//! [`AssetCache`] resolves a key (a URL or a local path) to a decoded image.
//! Remote keys go through a bounded in-memory LRU tier, an on-disk tier and,
//! on a miss, a single shared network fetch per key no matter how many
//! callers ask at once. Images produced locally are compressed into the
//! cache directory together with a thumbnail and are readable back from an
//! in-process index for the rest of the session.

pub mod cache;
pub mod codec;
pub mod config;
pub mod fetch;
pub mod memory;
pub mod paths;

mod error;

pub use cache::{AssetCache, CacheEntry, CacheStats, Origin, SavedAsset};
pub use config::AssetCacheConfig;
pub use error::{CacheError, FetchError, Result};
pub use fetch::{Fetcher, HttpFetcher};
