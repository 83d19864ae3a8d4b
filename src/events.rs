use crate::bitmap::Bitmap;
use crate::network::FetchError;

pub type ImageLoadedCallback = Box<dyn Fn(&str, &Bitmap) + Send + Sync>;
pub type ImageLoadFailedCallback = Box<dyn Fn(&str, &FetchError) + Send + Sync>;
pub type SlotTappedCallback = Box<dyn Fn(usize) + Send + Sync>;

/// Optional notifications from a collage to its host.
///
/// Each callback fires at most once per slot per event.
#[derive(Default)]
pub struct CollageEvents {
    pub on_image_loaded: Option<ImageLoadedCallback>,
    pub on_image_load_failed: Option<ImageLoadFailedCallback>,
    pub on_slot_tapped: Option<SlotTappedCallback>,
}

impl CollageEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_image_loaded(mut self, f: impl Fn(&str, &Bitmap) + Send + Sync + 'static) -> Self {
        self.on_image_loaded = Some(Box::new(f));
        self
    }

    pub fn on_image_load_failed(
        mut self,
        f: impl Fn(&str, &FetchError) + Send + Sync + 'static,
    ) -> Self {
        self.on_image_load_failed = Some(Box::new(f));
        self
    }

    pub fn on_slot_tapped(mut self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_slot_tapped = Some(Box::new(f));
        self
    }

    pub(crate) fn image_loaded(&self, url: &str, bitmap: &Bitmap) {
        if let Some(callback) = &self.on_image_loaded {
            callback(url, bitmap);
        }
    }

    pub(crate) fn image_load_failed(&self, url: &str, error: &FetchError) {
        if let Some(callback) = &self.on_image_load_failed {
            callback(url, error);
        }
    }

    pub(crate) fn slot_tapped(&self, index: usize) {
        if let Some(callback) = &self.on_slot_tapped {
            callback(index);
        }
    }
}
