#![allow(dead_code)]

use async_trait::async_trait;
use collage_view::cache::{CacheResult, ImageCache, LayeredImageCache, MemoryCache};
use collage_view::{Bitmap, CollageController, FetchError, MediaLoader, NetworkFetcher};
use image::{DynamicImage, RgbImage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

const GATE_PERMITS: usize = 1024;

pub fn bitmap(width: u32, height: u32) -> Bitmap {
    Bitmap::new(DynamicImage::ImageRgb8(RgbImage::new(width, height)))
}

/// In-process network: URLs containing "missing" answer 404, URLs
/// containing "panic" make the fetcher panic, everything else gets a bitmap
/// of the registered size (40x30 by default). While the gate is closed every
/// fetch waits.
pub struct ScriptedNetwork {
    gate: Semaphore,
    sizes: Mutex<HashMap<String, (u32, u32)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn open() -> Arc<Self> {
        Arc::new(Self::with_permits(GATE_PERMITS))
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self::with_permits(0))
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            gate: Semaphore::new(permits),
            sizes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(GATE_PERMITS);
    }

    pub fn respond_with_size(&self, url: &str, width: u32, height: u32) {
        self.sizes
            .lock()
            .unwrap()
            .insert(url.to_string(), (width, height));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkFetcher for ScriptedNetwork {
    async fn fetch(&self, url: &str) -> Result<Bitmap, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;

        if url.contains("missing") {
            return Err(FetchError::Status(404));
        }
        if url.contains("panic") {
            panic!("scripted fetcher panic for {}", url);
        }

        let (width, height) = self
            .sizes
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or((40, 30));
        Ok(bitmap(width, height))
    }
}

/// Memory cache that counts every call made through the trait
pub struct CountingCache {
    inner: LayeredImageCache,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LayeredImageCache::new(MemoryCache::new(32, 8), None),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.get(key).is_some()
    }
}

impl ImageCache for CountingCache {
    fn get(&self, key: &str) -> Option<Bitmap> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn put(&self, key: &str, bitmap: &Bitmap) -> CacheResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, bitmap)
    }

    fn clear_memory(&self) {
        self.inner.clear_memory();
    }

    fn clear_disk(&self) -> CacheResult<()> {
        self.inner.clear_disk()
    }
}

pub struct Harness {
    pub controller: CollageController,
    pub network: Arc<ScriptedNetwork>,
    pub cache: Arc<CountingCache>,
}

pub fn harness(network: Arc<ScriptedNetwork>) -> Harness {
    let cache = CountingCache::new();
    let loader = MediaLoader::new(cache.clone(), network.clone(), Handle::current());

    Harness {
        controller: CollageController::new(loader),
        network,
        cache,
    }
}
