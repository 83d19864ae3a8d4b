//! Layout and loading core of a collage widget.
//!
//! Given any number of media items, a [`CollageController`] shows at most
//! four of them (three for the stack style) in a fixed template, overlays a
//! "+N" label for the rest and loads remote images through a shared cache
//! and a network fetcher. Completions from a previous `setup` are discarded
//! by generation.

pub mod bitmap;
pub mod cache;
pub mod config;
pub mod content_mode;
pub mod controller;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout_config;
pub mod loader;
pub mod media_item;
pub mod network;
pub mod render;
pub mod template;

pub use bitmap::Bitmap;
pub use cache::{ImageCache, LayeredImageCache};
pub use config::Config;
pub use controller::{CollageController, CompletionOutcome, Slot, SlotState};
pub use error::{CollageError, CollageResult};
pub use events::CollageEvents;
pub use geometry::{Point, Rect, Size};
pub use layout_config::{CollageStyle, Color, ContentMode, CountLabelPosition, LayoutConfiguration};
pub use loader::MediaLoader;
pub use media_item::MediaItem;
pub use network::{FetchError, HttpFetcher, NetworkFetcher};
pub use render::CollageRenderer;
