use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use super::{CacheError, CacheResult};
use crate::bitmap::Bitmap;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Decoded bitmaps keyed by URL, bounded by entry count and decoded bytes
#[derive(Clone)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<String, Bitmap>>>,
    max_size_bytes: usize,
    current_size: Arc<Mutex<usize>>,
}

impl MemoryCache {
    pub fn new(capacity: usize, max_size_mb: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);

        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            max_size_bytes: max_size_mb * 1024 * 1024, // Convert MB to bytes
            current_size: Arc::new(Mutex::new(0)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bitmap> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(bitmap) = cache.get(key) {
                debug!("Memory cache hit for {}", key);
                return Some(bitmap.clone());
            }
        }

        debug!("Memory cache miss for {}", key);
        None
    }

    pub fn put(&self, key: &str, bitmap: Bitmap) -> CacheResult<()> {
        let data_size = bitmap.byte_size();

        // Check if this single item would exceed our size limit
        if data_size > self.max_size_bytes {
            debug!("Bitmap too large for memory cache: {} bytes", data_size);
            return Ok(());
        }

        let mut cache = self.cache.lock().map_err(|_| CacheError::Poisoned)?;
        let mut current_size = self.current_size.lock().map_err(|_| CacheError::Poisoned)?;

        // Make room if needed
        while *current_size + data_size > self.max_size_bytes && !cache.is_empty() {
            match cache.pop_lru() {
                Some((_, removed)) => {
                    *current_size = current_size.saturating_sub(removed.byte_size());
                    debug!(
                        "Evicted bitmap from memory cache, new size: {} bytes",
                        *current_size
                    );
                }
                None => break,
            }
        }

        // `push` also reports the entry dropped by the count bound
        if let Some((_, old)) = cache.push(key.to_string(), bitmap) {
            *current_size = current_size.saturating_sub(old.byte_size());
        }
        *current_size += data_size;

        debug!(
            "Added {} to memory cache, total size: {} bytes",
            key, *current_size
        );
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Bitmap> {
        if let (Ok(mut cache), Ok(mut current_size)) = (self.cache.lock(), self.current_size.lock())
        {
            if let Some(bitmap) = cache.pop(key) {
                *current_size = current_size.saturating_sub(bitmap.byte_size());
                debug!("Removed {} from memory cache", key);
                return Some(bitmap);
            }
        }

        None
    }

    pub fn clear(&self) {
        if let (Ok(mut cache), Ok(mut current_size)) = (self.cache.lock(), self.current_size.lock())
        {
            cache.clear();
            *current_size = 0;
            debug!("Cleared memory cache");
        }
    }

    /// (entries, capacity, decoded bytes)
    pub fn stats(&self) -> (usize, usize, usize) {
        if let (Ok(cache), Ok(current_size)) = (self.cache.lock(), self.current_size.lock()) {
            (cache.len(), cache.cap().get(), *current_size)
        } else {
            (0, 0, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    /// Square RGBA bitmap of `side * side * 4` bytes
    fn bitmap(side: u32) -> Bitmap {
        Bitmap::new(DynamicImage::ImageRgba8(RgbaImage::new(side, side)))
    }

    #[test]
    fn test_memory_cache_basic_operations() {
        let cache = MemoryCache::new(10, 1); // 10 items, 1MB
        let key = "https://example.com/a.jpg";
        let data = bitmap(2);

        // Initially empty
        assert!(cache.get(key).is_none());

        cache.put(key, data.clone()).unwrap();
        assert!(cache.get(key).unwrap().same_as(&data));

        let (len, cap, size) = cache.stats();
        assert_eq!(len, 1);
        assert_eq!(cap, 10);
        assert_eq!(size, 16);
    }

    #[test]
    fn test_memory_cache_eviction_by_count() {
        let cache = MemoryCache::new(2, 1); // 2 items max

        cache.put("k1", bitmap(5)).unwrap();
        cache.put("k2", bitmap(5)).unwrap();
        assert!(cache.get("k1").is_some());
        assert!(cache.get("k2").is_some());

        // k1 was read before k2, so it is the least recently used
        cache.put("k3", bitmap(5)).unwrap();

        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());

        let (len, _, size) = cache.stats();
        assert_eq!(len, 2);
        assert_eq!(size, 2 * 100);
    }

    #[test]
    fn test_memory_cache_size_limit() {
        let cache = MemoryCache::new(10, 1); // 1MB = 1,048,576 bytes

        // 1024 * 1024 * 4 bytes: too large
        cache.put("large", bitmap(1024)).unwrap();
        assert!(cache.get("large").is_none());

        cache.put("small", bitmap(16)).unwrap();
        assert!(cache.get("small").is_some());
    }

    #[test]
    fn test_memory_cache_evicts_to_fit_bytes() {
        let cache = MemoryCache::new(10, 1);

        // 400x400x4 = 640,000 bytes each; two do not fit into 1MB
        cache.put("first", bitmap(400)).unwrap();
        cache.put("second", bitmap(400)).unwrap();

        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert_eq!(cache.stats().2, 640_000);
    }

    #[test]
    fn test_memory_cache_remove_and_clear() {
        let cache = MemoryCache::new(10, 1);
        cache.put("a", bitmap(2)).unwrap();
        cache.put("b", bitmap(2)).unwrap();

        assert!(cache.remove("a").is_some());
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.stats().0, 1);

        cache.clear();
        let (len, _, size) = cache.stats();
        assert_eq!(len, 0);
        assert_eq!(size, 0);
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_memory_cache_replace_existing() {
        let cache = MemoryCache::new(10, 1);
        cache.put("key", bitmap(2)).unwrap();

        let replacement = bitmap(3);
        cache.put("key", replacement.clone()).unwrap();

        assert!(cache.get("key").unwrap().same_as(&replacement));
        let (len, _, size) = cache.stats();
        assert_eq!(len, 1);
        assert_eq!(size, 36);
    }
}
