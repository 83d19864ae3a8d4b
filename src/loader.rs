//! Resolves a [`MediaItem`] to a bitmap: inline image, then cache, then network.
//!
//! Network loads run as tokio tasks. Their results travel back through a
//! [`CompletionSink`] owned by the controller, which applies them on its own
//! thread. Every completion carries the [`LoadTicket`] it was issued with so
//! the controller can drop results from an older generation.

use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

use crate::bitmap::Bitmap;
use crate::cache::ImageCache;
use crate::error::{CollageError, CollageResult};
use crate::media_item::{MediaItem, MediaSource};
use crate::network::{FetchError, NetworkFetcher};

/// Identifies one load request: which slot, issued in which generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub generation: u64,
    pub slot: usize,
}

#[derive(Debug)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub url: String,
    pub result: Result<Bitmap, FetchError>,
}

/// Sending half of the completion channel plus the generation counter the
/// tickets are checked against
#[derive(Clone)]
pub struct CompletionSink {
    sender: UnboundedSender<LoadCompletion>,
    generation: Arc<AtomicU64>,
}

impl CompletionSink {
    pub fn channel() -> (Self, UnboundedReceiver<LoadCompletion>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Self {
            sender,
            generation: Arc::new(AtomicU64::new(0)),
        };
        (sink, receiver)
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new generation; every earlier ticket becomes stale
    pub fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.generation == self.current_generation()
    }

    fn deliver(&self, completion: LoadCompletion) {
        // A closed channel means the controller is gone; nobody to tell
        let _ = self.sender.send(completion);
    }
}

/// Handle to an in-flight network load
#[derive(Debug)]
pub struct LoadHandle {
    abort: AbortHandle,
}

impl LoadHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

#[derive(Debug)]
pub enum LoadStart {
    /// Available right away, either inline or from the cache
    Immediate { bitmap: Bitmap, from_cache: bool },
    /// Fetch issued; a completion will arrive on the sink
    Pending(LoadHandle),
    /// Nothing to load
    Unset,
}

#[derive(Clone)]
pub struct MediaLoader {
    cache: Arc<dyn ImageCache>,
    network: Arc<dyn NetworkFetcher>,
    runtime: Handle,
}

impl MediaLoader {
    pub fn new(
        cache: Arc<dyn ImageCache>,
        network: Arc<dyn NetworkFetcher>,
        runtime: Handle,
    ) -> Self {
        Self {
            cache,
            network,
            runtime,
        }
    }

    pub fn from_current_runtime(
        cache: Arc<dyn ImageCache>,
        network: Arc<dyn NetworkFetcher>,
    ) -> CollageResult<Self> {
        let runtime = Handle::try_current().map_err(|_| CollageError::NoRuntime)?;
        Ok(Self::new(cache, network, runtime))
    }

    pub fn cache(&self) -> &Arc<dyn ImageCache> {
        &self.cache
    }

    pub fn load(&self, item: &MediaItem, ticket: LoadTicket, sink: &CompletionSink) -> LoadStart {
        let raw_url = match item.source() {
            MediaSource::Inline(bitmap) => {
                return LoadStart::Immediate {
                    bitmap: bitmap.clone(),
                    from_cache: false,
                }
            }
            MediaSource::Remote(raw_url) if item.is_valid_remote() => raw_url,
            MediaSource::Remote(_) | MediaSource::Unset => return LoadStart::Unset,
        };

        if let Some(bitmap) = self.cache.get(raw_url) {
            return LoadStart::Immediate {
                bitmap,
                from_cache: true,
            };
        }

        let cache = self.cache.clone();
        let network = self.network.clone();
        let sink = sink.clone();
        let url = raw_url.to_string();

        let task = self.runtime.spawn(async move {
            let result = fetch_isolated(network, url.clone()).await;

            if let Ok(bitmap) = &result {
                if sink.is_current(ticket) {
                    store_in_cache(cache, url.clone(), bitmap.clone()).await;
                }
            }

            sink.deliver(LoadCompletion {
                ticket,
                url,
                result,
            });
        });

        LoadStart::Pending(LoadHandle {
            abort: task.abort_handle(),
        })
    }
}

/// Runs the fetch in its own task so a panicking fetcher still yields a completion
async fn fetch_isolated(
    network: Arc<dyn NetworkFetcher>,
    url: String,
) -> Result<Bitmap, FetchError> {
    let fetch = tokio::spawn(async move { network.fetch(&url).await });
    let _guard = AbortOnDrop(fetch.abort_handle());

    match fetch.await {
        Ok(result) => result,
        Err(e) => Err(FetchError::Task(e.to_string())),
    }
}

/// Aborts the inner fetch when the outer load task is cancelled
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn store_in_cache(cache: Arc<dyn ImageCache>, url: String, bitmap: Bitmap) {
    let stored = tokio::task::spawn_blocking(move || {
        let outcome = cache.put(&url, &bitmap);
        (url, outcome)
    })
    .await;

    match stored {
        Ok((_, Ok(()))) => {}
        Ok((url, Err(e))) => warn!("Failed to cache image {}: {}", url, e),
        Err(e) => warn!("Cache write task failed: {}", e),
    }
}
