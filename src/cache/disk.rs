use image::ImageFormat;
use log::{debug, error};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{cache_key_hash, CacheResult};
use crate::bitmap::Bitmap;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// PNG files under `cache_dir/<first 3 hash chars>/<sha256 of key>.png`
#[derive(Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn get(&self, key: &str) -> Option<Bitmap> {
        let cache_path = self.get_cache_path(key);

        let data = match fs::read(&cache_path) {
            Ok(data) => data,
            Err(_) => {
                debug!("Disk cache miss for {}", key);
                return None;
            }
        };

        match Bitmap::from_bytes(&data) {
            Ok(bitmap) => {
                debug!("Disk cache hit for {}", key);
                Some(bitmap)
            }
            Err(e) => {
                error!("Corrupt disk cache entry {}: {}", cache_path.display(), e);
                let _ = fs::remove_file(&cache_path);
                None
            }
        }
    }

    pub fn put(&self, key: &str, bitmap: &Bitmap) -> CacheResult<()> {
        let cache_path = self.get_cache_path(key);

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut buffer = Cursor::new(Vec::new());
        bitmap.image().write_to(&mut buffer, ImageFormat::Png)?;

        // Readers only ever see a complete file: write aside, then rename over
        let temp_path = Self::temp_path_for(&cache_path);
        if let Err(e) = fs::write(&temp_path, buffer.into_inner())
            .and_then(|()| fs::rename(&temp_path, &cache_path))
        {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!("Saved bitmap to disk cache: {:?}", cache_path);
        Ok(())
    }

    pub fn get_cache_path(&self, key: &str) -> PathBuf {
        let hash = cache_key_hash(key);

        // First 3 characters of the hash spread files over subdirectories
        let subdir = hash[..3].to_string();
        self.cache_dir.join(subdir).join(format!("{}.png", hash))
    }

    fn temp_path_for(cache_path: &Path) -> PathBuf {
        let file_name = cache_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        cache_path.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            unique
        ))
    }

    /// Removes every cached file, keeps the cache directory itself
    pub fn clear(&self) -> CacheResult<()> {
        if !self.cache_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;

            let removed = if file_type.is_dir() {
                fs::remove_dir_all(entry.path())
            } else {
                fs::remove_file(entry.path())
            };

            if let Err(e) = removed {
                error!(
                    "Failed to remove cache entry {}: {}",
                    entry.path().display(),
                    e
                );
            }
        }

        debug!("Cleared disk cache at {}", self.cache_dir.display());
        Ok(())
    }

    /// (files, bytes) currently on disk
    pub fn stats(&self) -> (usize, u64) {
        let mut total_files = 0;
        let mut total_size = 0;

        let Ok(subdirs) = fs::read_dir(&self.cache_dir) else {
            return (0, 0);
        };

        for subdir in subdirs.flatten() {
            let Ok(entries) = fs::read_dir(subdir.path()) else {
                continue;
            };
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    if metadata.is_file() {
                        total_files += 1;
                        total_size += metadata.len();
                    }
                }
            }
        }

        (total_files, total_size)
    }
}
