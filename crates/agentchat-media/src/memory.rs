//! Bounded in-memory tier.
//!
//! Least-recently-used eviction under two ceilings: an entry count and the
//! summed decoded size of the cached images. Eviction only drops the
//! in-memory copy.

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::DynamicImage;
use lru::LruCache;
use tracing::trace;

struct Slot {
    image: Arc<DynamicImage>,
    cost: usize,
}

pub struct MemoryTier {
    entries: LruCache<String, Slot>,
    bytes: usize,
    byte_limit: usize,
}

impl MemoryTier {
    /// A `count_limit` of zero is treated as one.
    pub fn new(count_limit: usize, byte_limit: usize) -> Self {
        let capacity = NonZeroUsize::new(count_limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            bytes: 0,
            byte_limit,
        }
    }

    /// Decoded size of an image, used as its cost against the byte ceiling.
    pub fn cost_of(image: &DynamicImage) -> usize {
        image.as_bytes().len()
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<Arc<DynamicImage>> {
        self.entries.get(key).map(|slot| Arc::clone(&slot.image))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Insert or replace `key`. An image larger than the whole byte ceiling
    /// is not cached (and any older value for `key` is dropped).
    pub fn insert(&mut self, key: &str, image: Arc<DynamicImage>) {
        let cost = Self::cost_of(&image);

        if let Some(old) = self.entries.pop(key) {
            self.bytes -= old.cost;
        }

        if cost > self.byte_limit {
            trace!(key, cost, limit = self.byte_limit, "image too large for memory tier");
            return;
        }

        while self.bytes + cost > self.byte_limit {
            match self.entries.pop_lru() {
                Some((evicted, slot)) => {
                    self.bytes -= slot.cost;
                    trace!(key = %evicted, cost = slot.cost, "evicted for size");
                }
                None => break,
            }
        }

        if let Some((evicted, slot)) = self.entries.push(key.to_string(), Slot { image, cost }) {
            // `push` hands back the LRU entry when the count ceiling is hit
            self.bytes -= slot.cost;
            trace!(key = %evicted, "evicted for count");
        }
        self.bytes += cost;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed cost of all cached images.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}
