use log::{info, warn};
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};

use crate::bitmap::Bitmap;
use crate::config::CacheConfig;

pub mod disk;
pub mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// Image cache consulted before any network fetch.
///
/// Keys are the image URL strings. Implementations are shared between every
/// in-flight load of every collage in the process and must tolerate
/// concurrent calls.
pub trait ImageCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Bitmap>;

    fn put(&self, key: &str, bitmap: &Bitmap) -> CacheResult<()>;

    fn clear_memory(&self);

    fn clear_disk(&self) -> CacheResult<()>;
}

/// Memory layer in front of an optional disk layer
#[derive(Clone)]
pub struct LayeredImageCache {
    memory: MemoryCache,
    disk: Option<DiskCache>,
}

impl LayeredImageCache {
    pub fn new(memory: MemoryCache, disk: Option<DiskCache>) -> Self {
        Self { memory, disk }
    }

    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let memory = MemoryCache::new(config.memory_cache_size, config.memory_cache_max_size_mb);
        let disk = config
            .disk_cache_path
            .as_ref()
            .map(DiskCache::new)
            .transpose()?;

        Ok(Self::new(memory, disk))
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }
}

impl ImageCache for LayeredImageCache {
    fn get(&self, key: &str) -> Option<Bitmap> {
        if let Some(bitmap) = self.memory.get(key) {
            return Some(bitmap);
        }

        let bitmap = self.disk.as_ref()?.get(key)?;

        // Promote disk hits so the next lookup stays in memory
        if let Err(e) = self.memory.put(key, bitmap.clone()) {
            warn!("Failed to promote {} to memory cache: {}", key, e);
        }
        Some(bitmap)
    }

    fn put(&self, key: &str, bitmap: &Bitmap) -> CacheResult<()> {
        self.memory.put(key, bitmap.clone())?;

        if let Some(disk) = &self.disk {
            disk.put(key, bitmap)?;
        }
        Ok(())
    }

    fn clear_memory(&self) {
        self.memory.clear();
    }

    fn clear_disk(&self) -> CacheResult<()> {
        match &self.disk {
            Some(disk) => disk.clear(),
            None => Ok(()),
        }
    }
}

static SHARED_CACHE: OnceLock<Arc<dyn ImageCache>> = OnceLock::new();

/// Install the process-wide cache. Only the first call wins; the installed
/// instance is returned either way.
pub fn install_shared(cache: Arc<dyn ImageCache>) -> Arc<dyn ImageCache> {
    let installed = SHARED_CACHE.get_or_init(|| {
        info!("Installed shared image cache");
        cache
    });
    installed.clone()
}

/// The process-wide cache, if one was installed
pub fn shared() -> Option<Arc<dyn ImageCache>> {
    SHARED_CACHE.get().cloned()
}

/// Hex SHA-256 of a cache key, used for on-disk names
pub fn cache_key_hash(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Cache lock poisoned")]
    Poisoned,
}

pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    fn bitmap() -> Bitmap {
        Bitmap::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)))
    }

    #[test]
    fn test_cache_key_hash() {
        let hash = cache_key_hash("https://example.com/a.jpg");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, cache_key_hash("https://example.com/a.jpg"));
        assert_ne!(hash, cache_key_hash("https://example.com/b.jpg"));
    }

    #[test]
    fn test_layered_cache_promotes_disk_hits() {
        let temp_dir = TempDir::new().unwrap();
        let disk = DiskCache::new(temp_dir.path()).unwrap();
        let cache = LayeredImageCache::new(MemoryCache::new(10, 1), Some(disk));
        let key = "https://example.com/a.png";

        cache.put(key, &bitmap()).unwrap();
        cache.clear_memory();
        assert!(cache.memory().get(key).is_none());

        assert!(cache.get(key).is_some());
        assert!(cache.memory().get(key).is_some());
    }

    #[test]
    fn test_clear_disk_keeps_memory() {
        let temp_dir = TempDir::new().unwrap();
        let disk = DiskCache::new(temp_dir.path()).unwrap();
        let cache = LayeredImageCache::new(MemoryCache::new(10, 1), Some(disk));

        cache.put("key", &bitmap()).unwrap();
        cache.clear_disk().unwrap();

        assert!(cache.get("key").is_some());
        assert_eq!(cache.disk().unwrap().stats().0, 0);

        cache.clear_memory();
        assert!(cache.get("key").is_none());
    }

    #[test]
    fn test_memory_only_cache() {
        let cache = LayeredImageCache::new(MemoryCache::new(10, 1), None);

        cache.put("key", &bitmap()).unwrap();
        assert!(cache.get("key").is_some());
        assert!(cache.clear_disk().is_ok());
    }
}
