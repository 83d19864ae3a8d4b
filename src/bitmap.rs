use image::{DynamicImage, ImageBuffer, Rgba};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::content_mode::IntrinsicSize;

const PLACEHOLDER_SIZE: u32 = 64;

/// Decoded image shared between slots, caches and in-flight loads.
///
/// Cloning only bumps a reference count. `scale` is pixels per point, the
/// same way a retina asset carries a 2x or 3x factor.
#[derive(Clone)]
pub struct Bitmap {
    image: Arc<DynamicImage>,
    scale: f64,
}

impl Bitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        if scale > 0.0 {
            self.scale = scale;
        }
        self
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::new(image::load_from_memory(bytes)?))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pixel_width(&self) -> u32 {
        self.image.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.image.height()
    }

    pub fn point_width(&self) -> f64 {
        self.image.width() as f64 / self.scale
    }

    pub fn point_height(&self) -> f64 {
        self.image.height() as f64 / self.scale
    }

    /// Decoded size in memory, used for cache accounting
    pub fn byte_size(&self) -> usize {
        self.image.as_bytes().len()
    }

    /// True when both handles point at the same decoded image
    pub fn same_as(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }

    pub fn intrinsic(&self) -> IntrinsicSize {
        IntrinsicSize {
            width_px: self.pixel_width() as f64,
            height_px: self.pixel_height() as f64,
            scale: self.scale,
        }
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.pixel_width())
            .field("height", &self.pixel_height())
            .field("scale", &self.scale)
            .finish()
    }
}

/// Built-in "broken image" placeholder used when the configuration has none.
/// Generated once per process: light grey tile with a darker diagonal cross.
pub fn default_placeholder() -> Bitmap {
    static PLACEHOLDER: OnceLock<Bitmap> = OnceLock::new();

    PLACEHOLDER
        .get_or_init(|| {
            let last = PLACEHOLDER_SIZE - 1;
            let tile = ImageBuffer::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
                if x == y || x + y == last {
                    Rgba([160, 160, 160, 255])
                } else {
                    Rgba([224, 224, 224, 255])
                }
            });
            Bitmap::new(DynamicImage::ImageRgba8(tile))
        })
        .clone()
}
