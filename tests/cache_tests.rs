use collage_view::cache::*;
use collage_view::config::CacheConfig;
use collage_view::Bitmap;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn bitmap(side: u32) -> Bitmap {
    Bitmap::new(DynamicImage::ImageRgba8(RgbaImage::new(side, side)))
}

#[test]
fn test_disk_cache_survives_new_instance() {
    let temp_dir = TempDir::new().unwrap();
    let key = "https://example.com/photo.png";

    let first = DiskCache::new(temp_dir.path()).unwrap();
    first.put(key, &bitmap(6)).unwrap();

    let second = DiskCache::new(temp_dir.path()).unwrap();
    let loaded = second.get(key).unwrap();
    assert_eq!(loaded.pixel_width(), 6);
    assert_eq!(loaded.pixel_height(), 6);
}

#[test]
fn test_disk_cache_path_is_sharded_by_hash() {
    let temp_dir = TempDir::new().unwrap();
    let cache = DiskCache::new(temp_dir.path()).unwrap();
    let key = "https://example.com/photo.png";
    let hash = cache_key_hash(key);

    let path = cache.get_cache_path(key);

    assert_eq!(path, temp_dir.path().join(&hash[..3]).join(format!("{}.png", hash)));
}

#[test]
fn test_corrupt_disk_entry_is_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let cache = DiskCache::new(temp_dir.path()).unwrap();
    let key = "https://example.com/broken.png";

    let path = cache.get_cache_path(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not an image").unwrap();

    assert!(cache.get(key).is_none());
    assert!(!path.exists());
}

#[test]
fn test_from_config_without_disk_path() {
    let config = CacheConfig {
        disk_cache_path: None,
        memory_cache_size: 5,
        memory_cache_max_size_mb: 1,
    };

    let cache = LayeredImageCache::from_config(&config).unwrap();

    assert!(cache.disk().is_none());
    assert_eq!(cache.memory().stats().1, 5);
}

#[test]
fn test_from_config_creates_disk_directory() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("images");
    let config = CacheConfig {
        disk_cache_path: Some(cache_dir.to_string_lossy().to_string()),
        memory_cache_size: 5,
        memory_cache_max_size_mb: 1,
    };

    let cache = LayeredImageCache::from_config(&config).unwrap();

    assert!(cache_dir.is_dir());
    assert_eq!(cache.disk().unwrap().cache_dir(), cache_dir.as_path());
}

#[test]
fn test_concurrent_access_from_many_threads() {
    let temp_dir = TempDir::new().unwrap();
    let cache: Arc<dyn ImageCache> = Arc::new(LayeredImageCache::new(
        MemoryCache::new(64, 4),
        Some(DiskCache::new(temp_dir.path()).unwrap()),
    ));

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let key = format!("https://example.com/{}/{}.png", worker, i);
                    cache.put(&key, &bitmap(4)).unwrap();
                    assert!(cache.get(&key).is_some());
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    cache.clear_memory();
    assert!(cache.get("https://example.com/3/7.png").is_some());

    cache.clear_disk().unwrap();
    cache.clear_memory();
    assert!(cache.get("https://example.com/3/7.png").is_none());
}

#[test]
fn test_shared_cache_installs_once() {
    let first: Arc<dyn ImageCache> = Arc::new(LayeredImageCache::new(MemoryCache::new(4, 1), None));
    let second: Arc<dyn ImageCache> =
        Arc::new(LayeredImageCache::new(MemoryCache::new(4, 1), None));

    let installed = install_shared(first.clone());
    let again = install_shared(second);

    assert!(Arc::ptr_eq(&installed, &again));
    assert!(Arc::ptr_eq(&installed, &shared().unwrap()));

    installed.put("shared-key", &bitmap(2)).unwrap();
    assert!(shared().unwrap().get("shared-key").is_some());
}
