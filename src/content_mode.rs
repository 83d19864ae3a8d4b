//! Picks how a bitmap is scaled inside its slot.
//!
//! Evaluated whenever a slot gets a bitmap (placeholder, inline image or
//! finished load) and again after every layout pass. The result is never
//! cached across frame changes.

use crate::geometry::Size;
use crate::layout_config::ContentMode;

/// Intrinsic image size as the resolver sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntrinsicSize {
    pub width_px: f64,
    pub height_px: f64,
    /// Pixels per point
    pub scale: f64,
}

impl IntrinsicSize {
    pub fn width_points(&self) -> f64 {
        self.width_px / self.scale
    }
}

/// Resolve the content mode for an image of `intrinsic` size shown in a slot
/// of `slot` size. An explicit `override_mode` always wins.
///
/// Degenerate sizes (zero width or height) make every ratio NaN or infinite;
/// all comparisons then fail and the result is `Fit`.
pub fn resolve(
    intrinsic: IntrinsicSize,
    slot: Size,
    override_mode: Option<ContentMode>,
) -> ContentMode {
    if let Some(mode) = override_mode {
        return mode;
    }

    let width_px = intrinsic.width_px;
    let height_px = intrinsic.height_px;
    let width_pt = intrinsic.width_points();

    let fits_inside = width_px < slot.width && height_px < slot.height;
    let narrower_than_slot = (height_px / width_px) < slot.height / slot.width;
    // Width in points against height in pixels
    let cross_ratio_narrower = (width_pt / height_px) < slot.width / slot.height;

    if fits_inside || narrower_than_slot || cross_ratio_narrower {
        ContentMode::Fill
    } else if width_pt > height_px && height_px < slot.height {
        ContentMode::TopAlignedFill
    } else {
        ContentMode::Fit
    }
}
